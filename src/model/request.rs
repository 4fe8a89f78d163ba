use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::{IntoParams, ToSchema};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestKind {
    Vacation,
    PersonalMatter,
    SickLeave,
    ClockingError,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn status(self) -> RequestStatus {
        match self {
            Decision::Approve => RequestStatus::Approved,
            Decision::Reject => RequestStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 4,
    "kind": "vacation",
    "start_date": "2026-08-03",
    "end_date": "2026-08-14",
    "comments": "Summer",
    "status": "pending",
    "created_at": "2026-06-01T09:00:00Z",
    "decided_at": null
}))]
pub struct Request {
    pub id: u64,
    pub employee_id: u64,
    pub kind: RequestKind,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub comments: Option<String>,
    pub status: RequestStatus,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl Request {
    /// Calendar days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[derive(Debug, Clone)]
pub struct NewRequest {
    pub employee_id: u64,
    pub kind: RequestKind,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateRequest {
    #[schema(example = "vacation")]
    pub kind: RequestKind,
    #[schema(example = "2026-08-03", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-08-14", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct RequestFilter {
    /// Filter by status
    pub status: Option<RequestStatus>,
    /// Filter by employee (HR only)
    pub employee_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VacationBalance {
    pub employee_id: u64,
    pub allowance: u32,
    pub used: i64,
    pub remaining: i64,
}
