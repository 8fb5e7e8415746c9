use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// region: Shift Types

/// Time-of-day band a shift belongs to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Journey {
    Morning,
    Afternoon,
    Night,
    FullDay,
}

impl Journey {
    /// Human readable label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Morning => "Morning",
            Self::Afternoon => "Afternoon",
            Self::Night => "Night",
            Self::FullDay => "24-Hour",
        }
    }
}

impl fmt::Display for Journey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub shift_type: Option<String>,
    /// Journey as stored by the backend; the classifier result wins on render.
    #[serde(default)]
    pub journey: Option<Journey>,
    #[serde(default)]
    pub total_hours: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
}

// endregion: Shift Types

// region: Schedule Types

/// A schedule board ("cuadro de turno") grouping the shifts of one team for a month.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Schedule {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub has_exception: Option<bool>,
    #[serde(default)]
    pub team_id: Option<Uuid>,
    #[serde(default)]
    pub macroprocess: Option<String>,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub subsection: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamMember {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Process {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ScheduleChange {
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ShiftChange {
    pub shift_id: Uuid,
    pub changed_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub old_value: Option<String>,
    #[serde(default)]
    pub new_value: Option<String>,
}

// endregion: Schedule Types

// region: Notification Types

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct NotificationRecipient {
    pub id: Uuid,
    pub address: String,
    pub is_permanent: bool,
    /// Opt-in flag, only meaningful for non-permanent recipients.
    pub is_selected: bool,
}

impl NotificationRecipient {
    pub fn is_active(&self) -> bool {
        self.is_permanent || self.is_selected
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    ScheduleCreated,
    ScheduleModified,
    ShiftChanged,
}

impl OperationKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::ScheduleCreated => "Cuadro de turno creado",
            Self::ScheduleModified => "Cuadro de turno modificado",
            Self::ShiftChanged => "Turno modificado",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Describes the CRUD action that triggered a notification. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangeOperation {
    /// Schedule board affected by the change.
    pub target_id: Uuid,
    pub kind: OperationKind,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct NotificationMessage {
    pub recipient_address: String,
    pub subject: String,
    pub body_html: String,
    pub sent_at: DateTime<Utc>,
    pub is_automatic: bool,
    pub related_schedule_id: Option<Uuid>,
}

// endregion: Notification Types
