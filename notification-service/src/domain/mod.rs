pub mod classifier;
pub mod context;
pub mod dispatch_state;
pub mod dispatcher;
pub mod recipient;
pub mod report;
pub mod transport;
