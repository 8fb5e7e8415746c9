use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::types::NotificationRecipient;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{BackendError, NotificationServiceError, ValidationError};

/// Body of the "add recipient" call. New recipients start inactive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct NewRecipient {
    pub address: String,
    pub is_permanent: bool,
    pub is_selected: bool,
}

/// One entry of a batch recipient-state update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct RecipientStateUpdate {
    pub id: Uuid,
    pub is_permanent: bool,
    pub is_selected: bool,
}

/// Source of truth for notification recipients. Read fresh on every dispatch.
#[cfg_attr(feature = "test-support", mockall::automock)]
#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn list_recipients(&self) -> Result<Vec<NotificationRecipient>, BackendError>;
    async fn create_recipient(
        &self,
        recipient: NewRecipient,
    ) -> Result<NotificationRecipient, BackendError>;
    async fn update_recipients(
        &self,
        updates: Vec<RecipientStateUpdate>,
    ) -> Result<(), BackendError>;
}

/// Recipients eligible for automatic notifications, in input order.
pub fn resolve_active_recipients(all: &[NotificationRecipient]) -> Vec<NotificationRecipient> {
    all.iter().filter(|r| r.is_active()).cloned().collect()
}

/// Trims `address` and checks it looks like an email address.
pub fn validate_address(address: &str) -> Result<String, ValidationError> {
    let address = address.trim();
    if !address.contains('@') {
        return Err(ValidationError::InvalidAddress(address.to_string()));
    }
    Ok(address.to_string())
}

/// Administration of the recipient list: add, opt-in toggles and the
/// permanent flag. Recipients are only ever deactivated, never deleted.
pub struct RecipientService {
    store: Arc<dyn RecipientStore>,
}

impl RecipientService {
    pub fn new(store: Arc<dyn RecipientStore>) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<NotificationRecipient>, NotificationServiceError> {
        self.store
            .list_recipients()
            .await
            .map_err(NotificationServiceError::RecipientStore)
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_active(
        &self,
    ) -> Result<Vec<NotificationRecipient>, NotificationServiceError> {
        Ok(resolve_active_recipients(&self.list().await?))
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_recipient(
        &self,
        address: &str,
    ) -> Result<NotificationRecipient, NotificationServiceError> {
        let address = validate_address(address)?;

        let created = self
            .store
            .create_recipient(NewRecipient {
                address,
                is_permanent: false,
                is_selected: false,
            })
            .await
            .map_err(NotificationServiceError::RecipientStore)?;

        tracing::info!(recipient_id = %created.id, "Recipient added");
        Ok(created)
    }

    /// Opts a non-permanent recipient in or out of automatic notifications.
    #[tracing::instrument(skip(self))]
    pub async fn set_selection(
        &self,
        id: Uuid,
        selected: bool,
    ) -> Result<NotificationRecipient, NotificationServiceError> {
        self.apply(id, |r| r.is_selected = selected).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_permanent_active(
        &self,
        id: Uuid,
        active: bool,
    ) -> Result<NotificationRecipient, NotificationServiceError> {
        self.apply(id, |r| r.is_permanent = active).await
    }

    /// Submits several state changes at once. Every id must exist.
    #[tracing::instrument(skip(self, updates), fields(count = updates.len()))]
    pub async fn update_recipients(
        &self,
        updates: Vec<RecipientStateUpdate>,
    ) -> Result<(), NotificationServiceError> {
        let current = self.list().await?;
        if let Some(missing) = updates
            .iter()
            .find(|u| !current.iter().any(|r| r.id == u.id))
        {
            return Err(NotificationServiceError::NotFound(format!(
                "Recipient {} not found",
                missing.id
            )));
        }

        self.store
            .update_recipients(updates)
            .await
            .map_err(NotificationServiceError::RecipientStore)
    }

    async fn apply(
        &self,
        id: Uuid,
        change: impl FnOnce(&mut NotificationRecipient),
    ) -> Result<NotificationRecipient, NotificationServiceError> {
        let mut recipient = self
            .list()
            .await?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| NotificationServiceError::NotFound(format!("Recipient {id} not found")))?;

        let before = recipient.clone();
        change(&mut recipient);
        if recipient == before {
            tracing::debug!(recipient_id = %id, "Recipient already in requested state");
            return Ok(recipient);
        }

        self.store
            .update_recipients(vec![RecipientStateUpdate {
                id,
                is_permanent: recipient.is_permanent,
                is_selected: recipient.is_selected,
            }])
            .await
            .map_err(NotificationServiceError::RecipientStore)?;

        tracing::info!(
            recipient_id = %id,
            is_permanent = recipient.is_permanent,
            is_selected = recipient.is_selected,
            "Recipient state updated"
        );
        Ok(recipient)
    }
}
