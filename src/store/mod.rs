//! Persistence seam. Services talk to `dyn Store`; the binary picks the
//! MySQL backend when a database URL is configured and the in-memory one
//! otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{
    AttendanceIndex, Client, ClockEvent, Employee, NewClockEvent, Request, RequestStatus,
    ScheduleType,
    employee::NewEmployee,
    request::NewRequest,
    schedule_type::ScheduleInput,
};

pub mod memory;
pub mod mysql;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional write lost against a concurrent one.
    #[error("stale write: {0}")]
    Conflict(String),

    #[error("unique constraint violated: {0}")]
    Duplicate(String),

    #[error("record is still referenced: {0}")]
    InUse(String),

    /// A write pointed at a row that no longer exists (or, for employees,
    /// is no longer active).
    #[error("referenced {0} does not exist")]
    Dangling(Reference),

    /// Deactivation refused because the employee's session is still open.
    #[error("employee {0} has an open session")]
    SessionOpen(u64),

    #[error("backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What a dangling write pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Reference {
    Employee,
    ScheduleType,
    Client,
}

/// Consistent read of the ledger for one reporting range.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSnapshot {
    /// Per employee, the last event strictly before `from`. Seeds the state
    /// of intervals that were already open when the range starts.
    pub carried: Vec<ClockEvent>,
    /// Events with `from <= recorded_at <= to`, ordered by employee, time, id.
    pub events: Vec<ClockEvent>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RequestQuery {
    pub employee_id: Option<u64>,
    pub status: Option<RequestStatus>,
}

#[async_trait]
pub trait Store: Send + Sync {
    // employees

    /// Fails with `Dangling(ScheduleType)` if the schedule is gone.
    async fn insert_employee(&self, employee: NewEmployee) -> StoreResult<Employee>;
    /// Replaces every mutable field of an existing employee. Fails with
    /// `Dangling(ScheduleType)` if the schedule is gone, and with
    /// `SessionOpen` when deactivating an employee who is clocked in or on
    /// break.
    async fn update_employee(&self, employee: &Employee) -> StoreResult<()>;
    async fn get_employee(&self, id: u64) -> StoreResult<Option<Employee>>;
    /// All employees, active or not, ordered by id.
    async fn list_employees(&self) -> StoreResult<Vec<Employee>>;
    /// Active employees whose name equals `name` exactly.
    async fn find_active_by_name(&self, name: &str) -> StoreResult<Vec<Employee>>;
    /// Names of all active employees, for warming the credential name filter.
    async fn active_names(&self) -> StoreResult<Vec<String>>;
    /// Every employee, active or not, assigned to the schedule.
    async fn employees_on_schedule(&self, schedule_id: u64) -> StoreResult<Vec<Employee>>;

    // clients

    async fn insert_client(&self, name: &str) -> StoreResult<Client>;
    async fn update_client(&self, client: &Client) -> StoreResult<()>;
    async fn get_client(&self, id: u64) -> StoreResult<Option<Client>>;
    async fn list_clients(&self) -> StoreResult<Vec<Client>>;
    /// Fails with `InUse` while any clock event references the client.
    async fn delete_client(&self, id: u64) -> StoreResult<bool>;

    // schedule types

    async fn insert_schedule(&self, input: ScheduleInput) -> StoreResult<ScheduleType>;
    async fn update_schedule(&self, schedule: &ScheduleType) -> StoreResult<()>;
    async fn get_schedule(&self, id: u64) -> StoreResult<Option<ScheduleType>>;
    async fn list_schedules(&self) -> StoreResult<Vec<ScheduleType>>;
    /// Fails with `InUse` while any employee references the schedule.
    async fn delete_schedule(&self, id: u64) -> StoreResult<bool>;

    // ledger

    async fn attendance_index(&self, employee_id: u64) -> StoreResult<AttendanceIndex>;
    /// Indexes of every employee that has recorded at least one event.
    async fn attendance_indexes(&self) -> StoreResult<Vec<AttendanceIndex>>;
    /// Appends `event` only if the employee's last event id is still
    /// `expected_last`, updating the status index in the same atomic unit.
    /// Returns `Conflict` otherwise, and `Dangling` when the employee is
    /// missing or inactive or the client is gone.
    async fn append_event(
        &self,
        event: NewClockEvent,
        expected_last: Option<u64>,
    ) -> StoreResult<ClockEvent>;
    async fn events_for_employee(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ClockEvent>>;
    /// Newest first, at most `limit`.
    async fn recent_events(&self, since: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ClockEvent>>;
    async fn ledger_snapshot(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        employee_id: Option<u64>,
    ) -> StoreResult<LedgerSnapshot>;

    // requests

    async fn insert_request(&self, request: NewRequest) -> StoreResult<Request>;
    async fn get_request(&self, id: u64) -> StoreResult<Option<Request>>;
    /// Newest first.
    async fn list_requests(&self, query: RequestQuery) -> StoreResult<Vec<Request>>;
    /// Moves a pending request to `status`. `None` when the request does not
    /// exist, `Conflict` if it was no longer pending.
    async fn decide_request(
        &self,
        id: u64,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
    ) -> StoreResult<Option<Request>>;
    async fn count_requests(&self, status: RequestStatus) -> StoreResult<u64>;
}
