use async_trait::async_trait;
use shared::types::NotificationMessage;

use crate::error::BackendError;

/// Messaging backend. A batch either succeeds or fails as a whole; no
/// per-recipient status is available.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send_batch(&self, messages: Vec<NotificationMessage>) -> Result<(), BackendError>;
}
