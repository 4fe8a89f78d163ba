use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use super::clock_event::{ClockEvent, EventKind};
use crate::error::StateError;

#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Eq,
    PartialEq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    AsRefStr,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    #[default]
    ClockedOut,
    ClockedIn,
    OnBreak,
}

impl AttendanceStatus {
    /// Status implied by the most recent event, or `ClockedOut` for an empty ledger.
    pub fn after(last: Option<EventKind>) -> Self {
        match last {
            None | Some(EventKind::Out) => AttendanceStatus::ClockedOut,
            Some(EventKind::In) | Some(EventKind::Resume) => AttendanceStatus::ClockedIn,
            Some(EventKind::Pause) => AttendanceStatus::OnBreak,
        }
    }

    /// The single transition table for the ledger.
    pub fn apply(self, kind: EventKind) -> Result<AttendanceStatus, StateError> {
        use AttendanceStatus::*;
        use EventKind::*;

        match (self, kind) {
            (ClockedOut, In) => Ok(ClockedIn),
            (ClockedIn, Pause) => Ok(OnBreak),
            (OnBreak, Resume) => Ok(ClockedIn),
            (ClockedIn, Out) | (OnBreak, Out) => Ok(ClockedOut),
            (from, attempted) => Err(StateError::InvalidTransition { from, attempted }),
        }
    }

    pub fn is_open(self) -> bool {
        self != AttendanceStatus::ClockedOut
    }
}

/// Per-employee pointer kept next to the ledger and updated in the same
/// atomic unit as every append.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceIndex {
    pub employee_id: u64,
    pub last_event: Option<ClockEvent>,
    /// Client and start of the open session; `None` when clocked out.
    pub session_client_id: Option<u64>,
    pub session_started_at: Option<DateTime<Utc>>,
}

impl AttendanceIndex {
    pub fn empty(employee_id: u64) -> Self {
        Self {
            employee_id,
            ..Default::default()
        }
    }

    pub fn status(&self) -> AttendanceStatus {
        AttendanceStatus::after(self.last_event.as_ref().map(|e| e.kind))
    }

    pub fn last_event_id(&self) -> Option<u64> {
        self.last_event.as_ref().map(|e| e.id)
    }

    /// Index after `event` has been appended.
    pub fn advanced(&self, event: ClockEvent) -> Self {
        let (session_client_id, session_started_at) = match event.kind {
            EventKind::In => (Some(event.client_id), Some(event.recorded_at)),
            EventKind::Out => (None, None),
            EventKind::Pause | EventKind::Resume => {
                (self.session_client_id, self.session_started_at)
            }
        };

        Self {
            employee_id: self.employee_id,
            last_event: Some(event),
            session_client_id,
            session_started_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "employee_id": 4,
    "status": "clocked_in",
    "last_event": {
        "id": 17,
        "employee_id": 4,
        "client_id": 1,
        "kind": "in",
        "recorded_at": "2026-03-02T08:00:00Z"
    },
    "session_client_id": 1,
    "session_started_at": "2026-03-02T08:00:00Z"
}))]
pub struct StatusView {
    pub employee_id: u64,
    pub status: AttendanceStatus,
    pub last_event: Option<ClockEvent>,
    pub session_client_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub session_started_at: Option<DateTime<Utc>>,
}

impl From<&AttendanceIndex> for StatusView {
    fn from(index: &AttendanceIndex) -> Self {
        Self {
            employee_id: index.employee_id,
            status: index.status(),
            last_event: index.last_event.clone(),
            session_client_id: index.session_client_id,
            session_started_at: index.session_started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AttendanceStatus::*;
    use EventKind::*;

    #[test]
    fn happy_path_transitions() {
        assert_eq!(ClockedOut.apply(In), Ok(ClockedIn));
        assert_eq!(ClockedIn.apply(Pause), Ok(OnBreak));
        assert_eq!(OnBreak.apply(Resume), Ok(ClockedIn));
        assert_eq!(ClockedIn.apply(Out), Ok(ClockedOut));
        assert_eq!(OnBreak.apply(Out), Ok(ClockedOut));
    }

    #[test]
    fn same_kind_twice_is_rejected() {
        for (state, kind) in [(ClockedOut, Out), (ClockedIn, In), (OnBreak, Pause)] {
            let next = state.apply(kind);
            assert_eq!(
                next,
                Err(StateError::InvalidTransition {
                    from: state,
                    attempted: kind
                })
            );
        }
        assert!(ClockedIn.apply(Resume).is_err());
        assert!(ClockedOut.apply(Pause).is_err());
    }

    #[test]
    fn index_tracks_session_client_through_breaks() {
        let at = Utc::now();
        let event = |id, kind| ClockEvent {
            id,
            employee_id: 9,
            client_id: 3,
            kind,
            recorded_at: at,
        };

        let index = AttendanceIndex::empty(9)
            .advanced(event(1, In))
            .advanced(event(2, Pause));
        assert_eq!(index.status(), OnBreak);
        assert_eq!(index.session_client_id, Some(3));
        assert_eq!(index.session_started_at, Some(at));

        let closed = index.advanced(event(3, Out));
        assert_eq!(closed.status(), ClockedOut);
        assert_eq!(closed.session_client_id, None);
        assert_eq!(closed.last_event_id(), Some(3));
    }
}
