use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::clock_event::ActivityEntry;
use crate::error::ValidationError;

/// What a summary covers: a closed time range, optionally narrowed to one
/// client and/or one employee.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, IntoParams, ToSchema)]
pub struct ReportScope {
    /// Range start (RFC 3339)
    #[schema(value_type = String, format = "date-time", example = "2026-03-01T00:00:00Z")]
    #[param(value_type = String, format = "date-time")]
    pub from: DateTime<Utc>,
    /// Range end (RFC 3339)
    #[schema(value_type = String, format = "date-time", example = "2026-03-31T23:59:59Z")]
    #[param(value_type = String, format = "date-time")]
    pub to: DateTime<Utc>,
    /// Only time booked against this client
    pub client_id: Option<u64>,
    /// Only this employee
    pub employee_id: Option<u64>,
}

impl ReportScope {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from < self.to {
            Ok(())
        } else {
            Err(ValidationError::InvalidRange)
        }
    }

    /// Length of the range in (fractional) days.
    pub fn days(&self) -> f64 {
        (self.to - self.from).num_milliseconds() as f64 / 86_400_000.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeHours {
    pub employee_id: u64,
    pub name: String,
    pub hours: f64,
    /// A working interval was still open at the end of the range.
    pub open: bool,
    /// Expected hours for the range from the assigned schedule type.
    pub target_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeShare {
    pub employee_id: u64,
    pub name: String,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ClientHours {
    pub client_id: u64,
    pub name: String,
    pub hours: f64,
    pub employees: Vec<EmployeeShare>,
}

/// A ledger event that does not fit the attendance state machine. It is
/// left out of the totals.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Anomaly {
    pub event_id: u64,
    pub employee_id: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct FleetStats {
    /// Active employees
    pub total_employees: usize,
    /// Employees in an open session that started today
    pub active_today: usize,
    pub pending_requests: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "scope": { "from": "2026-03-02T07:00:00Z", "to": "2026-03-02T11:00:00Z", "client_id": null, "employee_id": 4 },
    "total_hours": 2.0,
    "employees": [{ "employee_id": 4, "name": "Juanjo", "hours": 2.0, "open": false, "target_hours": null }],
    "clients": [{ "client_id": 1, "name": "Cliente A", "hours": 2.0,
                  "employees": [{ "employee_id": 4, "name": "Juanjo", "hours": 2.0 }] }],
    "anomalies": [],
    "fleet": { "total_employees": 12, "active_today": 3, "pending_requests": 1 }
}))]
pub struct Summary {
    pub scope: ReportScope,
    pub total_hours: f64,
    pub employees: Vec<EmployeeHours>,
    pub clients: Vec<ClientHours>,
    pub anomalies: Vec<Anomaly>,
    pub fleet: FleetStats,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    pub fleet: FleetStats,
    /// Newest first
    pub recent_activity: Vec<ActivityEntry>,
}
