use std::sync::Arc;

use chrono_tz::Tz;

use crate::domain::{dispatcher::Dispatcher, recipient::RecipientService};

pub struct NotificationAppState {
    pub dispatcher: Arc<Dispatcher>,
    pub recipient_service: Arc<RecipientService>,
    /// Wall clock used to classify shifts submitted over HTTP.
    pub timezone: Tz,
}
