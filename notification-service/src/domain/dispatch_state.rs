use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use shared::types::{ChangeOperation, NotificationMessage, NotificationRecipient};
use uuid::Uuid;

use crate::domain::context::ChangeContext;
use crate::domain::recipient::resolve_active_recipients;
use crate::domain::report::{ReportInput, render_change_report, subject_for};
use crate::error::RenderError;

/// A dispatch that has not looked at recipients yet.
/// Transitions: `PendingDispatch` -> `RecipientsResolved` -> `ContextLoaded`
/// -> `ReportRendered`. Each step consumes the previous state.
pub struct PendingDispatch {
    operation: ChangeOperation,
}

/// At least one active recipient is known.
pub struct RecipientsResolved {
    operation: ChangeOperation,
    recipients: Vec<NotificationRecipient>,
}

/// Recipients and the full report context are in hand.
pub struct ContextLoaded {
    operation: ChangeOperation,
    recipients: Vec<NotificationRecipient>,
    context: ChangeContext,
}

/// Subject and body are final; only message building is left.
pub struct ReportRendered {
    operation: ChangeOperation,
    recipients: Vec<NotificationRecipient>,
    subject: String,
    body_html: String,
}

impl PendingDispatch {
    pub fn new(operation: ChangeOperation) -> Self {
        Self { operation }
    }

    pub fn operation(&self) -> &ChangeOperation {
        &self.operation
    }

    /// Keeps the active recipients. `None` means there is nobody to notify.
    pub fn resolve_recipients(self, all: &[NotificationRecipient]) -> Option<RecipientsResolved> {
        let recipients = resolve_active_recipients(all);
        if recipients.is_empty() {
            return None;
        }
        Some(RecipientsResolved {
            operation: self.operation,
            recipients,
        })
    }
}

impl RecipientsResolved {
    pub fn schedule_id(&self) -> Uuid {
        self.operation.target_id
    }

    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    pub fn with_context(self, context: ChangeContext) -> ContextLoaded {
        ContextLoaded {
            operation: self.operation,
            recipients: self.recipients,
            context,
        }
    }
}

impl ContextLoaded {
    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    pub fn render(
        self,
        generated_at: DateTime<Utc>,
        timezone: Tz,
    ) -> Result<ReportRendered, RenderError> {
        let input =
            ReportInput::from_context(&self.context, &self.operation, generated_at, timezone);
        let body_html = render_change_report(&input)?;
        let subject = subject_for(&self.operation, self.context.schedule.as_ref());

        Ok(ReportRendered {
            operation: self.operation,
            recipients: self.recipients,
            subject,
            body_html,
        })
    }
}

impl ReportRendered {
    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// One automatic message per recipient, all sharing subject and body.
    pub fn into_messages(self, sent_at: DateTime<Utc>) -> Vec<NotificationMessage> {
        let related_schedule_id = Some(self.operation.target_id);
        self.recipients
            .into_iter()
            .map(|r| NotificationMessage {
                recipient_address: r.address,
                subject: self.subject.clone(),
                body_html: self.body_html.clone(),
                sent_at,
                is_automatic: true,
                related_schedule_id,
            })
            .collect()
    }
}
