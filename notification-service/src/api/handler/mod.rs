pub mod notification;
pub mod recipient;
pub mod shift;
