use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDateTime;
use shared::responses::ApiResponse;
use thiserror::Error;
use uuid::Uuid;

/// Input rejected before anything is persisted or dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Shift end {end} must be after start {start}")]
    InvertedInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("Invalid recipient address: {0:?}")]
    InvalidAddress(String),
}

/// Failure raised by a backend collaborator (recipient store, context
/// fetcher, notification transport).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend answered with a non-success status.
    #[error("Backend returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// Backend could not be reached (connect error, timeout, retries exhausted).
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    /// Backend accepted the request but reported it as failed.
    #[error("Backend rejected request: {0}")]
    Rejected(String),

    /// Body did not match the expected shape.
    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    /// Request was abandoned through its cancellation token.
    #[error("Backend request cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Schedule {0} is not available")]
    MissingSchedule(Uuid),
}

/// Application-level errors for the notification service.
///
/// Dispatch-related variants carry the number of recipients the notification
/// was meant for so callers can report how many people were affected.
#[derive(Debug, Error)]
pub enum NotificationServiceError {
    #[error("Validation Error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Recipient store error: {0}")]
    RecipientStore(#[source] BackendError),

    #[error("Failed to fetch notification context: {source}")]
    ContextFetch {
        intended_recipients: usize,
        #[source]
        source: BackendError,
    },

    #[error("Failed to render change report: {source}")]
    Render {
        intended_recipients: usize,
        #[source]
        source: RenderError,
    },

    #[error("Failed to send notification to {intended_recipients} recipient(s): {source}")]
    Dispatch {
        intended_recipients: usize,
        #[source]
        source: BackendError,
    },
}

impl NotificationServiceError {
    /// Recipients affected by a failed dispatch; 0 when the failure happened
    /// before the recipient list existed.
    pub fn intended_recipients(&self) -> usize {
        match self {
            Self::ContextFetch {
                intended_recipients,
                ..
            }
            | Self::Render {
                intended_recipients,
                ..
            }
            | Self::Dispatch {
                intended_recipients,
                ..
            } => *intended_recipients,
            Self::Validation(_) | Self::NotFound(_) | Self::RecipientStore(_) => 0,
        }
    }
}

#[derive(Debug, serde::Serialize)]
struct FailureDetail {
    intended_recipients: usize,
}

impl IntoResponse for NotificationServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::RecipientStore(_) | Self::ContextFetch { .. } | Self::Dispatch { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self, %status, "Server error");
        } else {
            tracing::warn!(error = %self, %status, "Client error");
        }

        let detail = match &self {
            Self::ContextFetch { .. } | Self::Render { .. } | Self::Dispatch { .. } => {
                Some(FailureDetail {
                    intended_recipients: self.intended_recipients(),
                })
            }
            _ => None,
        };

        let body = ApiResponse::err_with(self.to_string(), detail);
        (status, axum::Json(body)).into_response()
    }
}
