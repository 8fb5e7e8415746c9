use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use shared::types::{ChangeOperation, NotificationMessage};
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::context::{ContextFetcher, fetch_context};
use crate::domain::dispatch_state::PendingDispatch;
use crate::domain::recipient::{RecipientStore, validate_address};
use crate::domain::transport::NotificationTransport;
use crate::error::NotificationServiceError;

/// Source of "now" for report timestamps and `sent_at`.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Successful end states of a dispatch. Failures are
/// [`NotificationServiceError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchOutcome {
    Sent { recipients: usize },
    /// Nobody to notify. Not an error.
    Skipped,
}

/// Operator-composed message sent to explicit addresses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ManualNotification {
    pub schedule_id: Option<Uuid>,
    pub addresses: Vec<String>,
    pub subject: String,
    pub body_html: String,
}

/// Turns change operations into batches of notification messages.
///
/// Every step runs at most once: nothing is retried here and a failure at any
/// step means nothing is sent. Retry policy belongs to the caller.
#[derive(Clone)]
pub struct Dispatcher {
    recipients: Arc<dyn RecipientStore>,
    context: Arc<dyn ContextFetcher>,
    transport: Arc<dyn NotificationTransport>,
    timezone: Tz,
    clock: Clock,
    task_tracker: TaskTracker,
}

impl Dispatcher {
    pub fn new(
        recipients: Arc<dyn RecipientStore>,
        context: Arc<dyn ContextFetcher>,
        transport: Arc<dyn NotificationTransport>,
        timezone: Tz,
    ) -> Self {
        Self {
            recipients,
            context,
            transport,
            timezone,
            clock: Arc::new(Utc::now),
            task_tracker: TaskTracker::new(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn task_tracker(&self) -> &TaskTracker {
        &self.task_tracker
    }

    /// Fetch recipients → fetch context → render → build messages → submit.
    #[tracing::instrument(skip(self), fields(schedule_id = %operation.target_id, kind = ?operation.kind))]
    pub async fn dispatch_change_notification(
        &self,
        operation: ChangeOperation,
    ) -> Result<DispatchOutcome, NotificationServiceError> {
        let pending = PendingDispatch::new(operation);

        let all = self
            .recipients
            .list_recipients()
            .await
            .map_err(NotificationServiceError::RecipientStore)?;

        let Some(resolved) = pending.resolve_recipients(&all) else {
            tracing::info!("No active recipients, skipping notification");
            return Ok(DispatchOutcome::Skipped);
        };
        let intended_recipients = resolved.recipient_count();

        let context = fetch_context(self.context.as_ref(), resolved.schedule_id())
            .await
            .map_err(|source| NotificationServiceError::ContextFetch {
                intended_recipients,
                source,
            })?;

        let rendered = resolved
            .with_context(context)
            .render((self.clock)(), self.timezone)
            .map_err(|source| NotificationServiceError::Render {
                intended_recipients,
                source,
            })?;

        tracing::debug!(subject = rendered.subject(), "Change report rendered");

        let messages = rendered.into_messages((self.clock)());
        self.submit(messages).await
    }

    /// Runs [`Self::dispatch_change_notification`] in the background.
    /// Failures are logged; shutdown waits on [`Self::task_tracker`].
    pub fn spawn_dispatch(&self, operation: ChangeOperation) {
        let dispatcher = self.clone();
        let span = tracing::info_span!(
            "spawned_dispatch",
            schedule_id = %operation.target_id,
            kind = ?operation.kind
        );

        self.task_tracker.spawn(
            async move {
                match dispatcher.dispatch_change_notification(operation).await {
                    Ok(outcome) => tracing::info!(?outcome, "Background dispatch finished"),
                    Err(e) => tracing::error!(
                        intended_recipients = e.intended_recipients(),
                        "Background dispatch failed: {e}"
                    ),
                }
            }
            .instrument(span),
        );
    }

    /// Sends an operator-written message to explicit addresses
    /// (`is_automatic = false`). Duplicate addresses are sent once.
    #[tracing::instrument(skip(self, notification), fields(count = notification.addresses.len()))]
    pub async fn send_manual(
        &self,
        notification: ManualNotification,
    ) -> Result<DispatchOutcome, NotificationServiceError> {
        let mut addresses: Vec<String> = Vec::with_capacity(notification.addresses.len());
        for address in &notification.addresses {
            let address = validate_address(address)?;
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }

        if addresses.is_empty() {
            tracing::info!("Manual notification without addresses, skipping");
            return Ok(DispatchOutcome::Skipped);
        }

        let sent_at = (self.clock)();
        let messages = addresses
            .into_iter()
            .map(|recipient_address| NotificationMessage {
                recipient_address,
                subject: notification.subject.clone(),
                body_html: notification.body_html.clone(),
                sent_at,
                is_automatic: false,
                related_schedule_id: notification.schedule_id,
            })
            .collect();

        self.submit(messages).await
    }

    async fn submit(
        &self,
        messages: Vec<NotificationMessage>,
    ) -> Result<DispatchOutcome, NotificationServiceError> {
        let intended_recipients = messages.len();

        self.transport
            .send_batch(messages)
            .await
            .map_err(|source| NotificationServiceError::Dispatch {
                intended_recipients,
                source,
            })?;

        tracing::info!(recipients = intended_recipients, "Notification batch sent");
        Ok(DispatchOutcome::Sent {
            recipients: intended_recipients,
        })
    }
}
