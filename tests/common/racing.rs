use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use fichaje::model::employee::{CreateEmployee, NewEmployee};
use fichaje::model::request::NewRequest;
use fichaje::model::schedule_type::ScheduleInput;
use fichaje::model::{
    Actor, AttendanceIndex, Client, ClockEvent, Employee, NewClockEvent, Request, RequestStatus,
    Role, ScheduleType,
};
use fichaje::store::{LedgerSnapshot, RequestQuery, Store, StoreError, StoreResult};
use fichaje::{AppState, Config, ManualClock, MemoryStore};

use super::t0;

/// How the wrapper disturbs the ledger path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Race {
    /// Yield to other tasks right after reading a status index, schedule or
    /// client, so concurrent writers act on the same stale read.
    YieldAfterRead,
    /// Every append loses its compare-and-append.
    AlwaysLose,
}

/// Memory store that lets tests force the interleavings a real database
/// produces under load.
pub struct RacingStore {
    inner: MemoryStore,
    race: Race,
    conflicts: AtomicUsize,
}

impl RacingStore {
    pub fn new(race: Race) -> Self {
        Self {
            inner: MemoryStore::new(),
            race,
            conflicts: AtomicUsize::new(0),
        }
    }

    /// Appends that came back as `Conflict`.
    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        if self.race == Race::YieldAfterRead {
            tokio::task::yield_now().await;
        }
    }
}

/// State over a `RacingStore`, seeded with one employee and one client.
pub async fn racing_state(race: Race) -> (Arc<RacingStore>, AppState, Employee, Client) {
    let store = Arc::new(RacingStore::new(race));
    let clock = Arc::new(ManualClock::new(t0()));
    let state = AppState::build(store.clone(), clock, &Config::for_tests()).unwrap();
    let ana = state
        .directory
        .create(
            &system_hr(),
            CreateEmployee {
                name: "Ana".into(),
                pin: "2222".into(),
                avatar_url: None,
                schedule_id: None,
                role: None,
                vacation_days: None,
            },
        )
        .await
        .unwrap();
    let client = state.clients.create(&system_hr(), "Cliente A").await.unwrap();
    (store, state, ana, client)
}

pub fn system_hr() -> Actor {
    Actor::new(0, Role::HrManager)
}

#[async_trait]
impl Store for RacingStore {
    async fn insert_employee(&self, employee: NewEmployee) -> StoreResult<Employee> {
        self.inner.insert_employee(employee).await
    }

    async fn update_employee(&self, employee: &Employee) -> StoreResult<()> {
        self.inner.update_employee(employee).await
    }

    async fn get_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        self.inner.get_employee(id).await
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        self.inner.list_employees().await
    }

    async fn find_active_by_name(&self, name: &str) -> StoreResult<Vec<Employee>> {
        self.inner.find_active_by_name(name).await
    }

    async fn active_names(&self) -> StoreResult<Vec<String>> {
        self.inner.active_names().await
    }

    async fn employees_on_schedule(&self, schedule_id: u64) -> StoreResult<Vec<Employee>> {
        self.inner.employees_on_schedule(schedule_id).await
    }

    async fn insert_client(&self, name: &str) -> StoreResult<Client> {
        self.inner.insert_client(name).await
    }

    async fn update_client(&self, client: &Client) -> StoreResult<()> {
        self.inner.update_client(client).await
    }

    async fn get_client(&self, id: u64) -> StoreResult<Option<Client>> {
        let client = self.inner.get_client(id).await?;
        self.pause().await;
        Ok(client)
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        self.inner.list_clients().await
    }

    async fn delete_client(&self, id: u64) -> StoreResult<bool> {
        self.inner.delete_client(id).await
    }

    async fn insert_schedule(&self, input: ScheduleInput) -> StoreResult<ScheduleType> {
        self.inner.insert_schedule(input).await
    }

    async fn update_schedule(&self, schedule: &ScheduleType) -> StoreResult<()> {
        self.inner.update_schedule(schedule).await
    }

    async fn get_schedule(&self, id: u64) -> StoreResult<Option<ScheduleType>> {
        let schedule = self.inner.get_schedule(id).await?;
        self.pause().await;
        Ok(schedule)
    }

    async fn list_schedules(&self) -> StoreResult<Vec<ScheduleType>> {
        self.inner.list_schedules().await
    }

    async fn delete_schedule(&self, id: u64) -> StoreResult<bool> {
        self.inner.delete_schedule(id).await
    }

    async fn attendance_index(&self, employee_id: u64) -> StoreResult<AttendanceIndex> {
        let index = self.inner.attendance_index(employee_id).await?;
        self.pause().await;
        Ok(index)
    }

    async fn attendance_indexes(&self) -> StoreResult<Vec<AttendanceIndex>> {
        self.inner.attendance_indexes().await
    }

    async fn append_event(
        &self,
        event: NewClockEvent,
        expected_last: Option<u64>,
    ) -> StoreResult<ClockEvent> {
        let result = match self.race {
            Race::AlwaysLose => Err(StoreError::Conflict("forced".into())),
            Race::YieldAfterRead => self.inner.append_event(event, expected_last).await,
        };
        if matches!(result, Err(StoreError::Conflict(_))) {
            self.conflicts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn events_for_employee(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ClockEvent>> {
        self.inner.events_for_employee(employee_id, from, to).await
    }

    async fn recent_events(&self, since: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ClockEvent>> {
        self.inner.recent_events(since, limit).await
    }

    async fn ledger_snapshot(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        employee_id: Option<u64>,
    ) -> StoreResult<LedgerSnapshot> {
        self.inner.ledger_snapshot(from, to, employee_id).await
    }

    async fn insert_request(&self, request: NewRequest) -> StoreResult<Request> {
        self.inner.insert_request(request).await
    }

    async fn get_request(&self, id: u64) -> StoreResult<Option<Request>> {
        self.inner.get_request(id).await
    }

    async fn list_requests(&self, query: RequestQuery) -> StoreResult<Vec<Request>> {
        self.inner.list_requests(query).await
    }

    async fn decide_request(
        &self,
        id: u64,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
    ) -> StoreResult<Option<Request>> {
        self.inner.decide_request(id, status, decided_at).await
    }

    async fn count_requests(&self, status: RequestStatus) -> StoreResult<u64> {
        self.inner.count_requests(status).await
    }
}
