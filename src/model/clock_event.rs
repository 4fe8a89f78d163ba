use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    In,
    Pause,
    Resume,
    Out,
}

impl EventKind {
    /// Whether this event starts a working interval.
    pub fn opens_interval(self) -> bool {
        matches!(self, EventKind::In | EventKind::Resume)
    }
}

/// One immutable ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 17,
    "employee_id": 4,
    "client_id": 1,
    "kind": "in",
    "recorded_at": "2026-03-02T08:00:00Z"
}))]
pub struct ClockEvent {
    pub id: u64,
    pub employee_id: u64,
    pub client_id: u64,
    pub kind: EventKind,
    #[schema(value_type = String, format = "date-time")]
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewClockEvent {
    pub employee_id: u64,
    pub client_id: u64,
    pub kind: EventKind,
    pub recorded_at: DateTime<Utc>,
}

impl NewClockEvent {
    pub fn with_id(self, id: u64) -> ClockEvent {
        ClockEvent {
            id,
            employee_id: self.employee_id,
            client_id: self.client_id,
            kind: self.kind,
            recorded_at: self.recorded_at,
        }
    }
}

/// A ledger row joined with display names, for dashboards and history views.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityEntry {
    #[serde(flatten)]
    pub event: ClockEvent,
    pub employee_name: String,
    pub client_name: String,
}
