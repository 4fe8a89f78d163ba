use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{LedgerSnapshot, Reference, RequestQuery, Store, StoreError, StoreResult};
use crate::model::{
    AttendanceIndex, Client, ClockEvent, Employee, NewClockEvent, Request, RequestStatus,
    ScheduleType, client,
    employee::NewEmployee,
    request::NewRequest,
    schedule_type::ScheduleInput,
};

#[derive(Default)]
struct Tables {
    employees: BTreeMap<u64, Employee>,
    clients: BTreeMap<u64, Client>,
    schedules: BTreeMap<u64, ScheduleType>,
    /// Append-only, in id order.
    events: Vec<ClockEvent>,
    indexes: HashMap<u64, AttendanceIndex>,
    requests: BTreeMap<u64, Request>,
    last_id: u64,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }

    fn require_schedule(&self, schedule_id: Option<u64>) -> StoreResult<()> {
        match schedule_id {
            Some(id) if !self.schedules.contains_key(&id) => {
                Err(StoreError::Dangling(Reference::ScheduleType))
            }
            _ => Ok(()),
        }
    }

    fn index_of(&self, employee_id: u64) -> AttendanceIndex {
        self.indexes
            .get(&employee_id)
            .cloned()
            .unwrap_or_else(|| AttendanceIndex::empty(employee_id))
    }
}

/// Process-local store. One lock guards every table so an append and its
/// index update are a single critical section, and snapshots are consistent.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(what: &str, id: u64) -> StoreError {
    StoreError::Backend(format!("{what} {id} does not exist"))
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_employee(&self, employee: NewEmployee) -> StoreResult<Employee> {
        let mut tables = self.tables.write().await;
        tables.require_schedule(employee.schedule_id)?;
        let id = tables.next_id();
        let employee = Employee {
            id,
            name: employee.name,
            pin_hash: employee.pin_hash,
            avatar_url: employee.avatar_url,
            schedule_id: employee.schedule_id,
            role: employee.role,
            vacation_days: employee.vacation_days,
            active: true,
            created_at: employee.created_at,
        };
        tables.employees.insert(id, employee.clone());
        Ok(employee)
    }

    async fn update_employee(&self, employee: &Employee) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.require_schedule(employee.schedule_id)?;
        let deactivating = tables
            .employees
            .get(&employee.id)
            .is_some_and(|current| current.active && !employee.active);
        if deactivating && tables.index_of(employee.id).status().is_open() {
            return Err(StoreError::SessionOpen(employee.id));
        }
        match tables.employees.get_mut(&employee.id) {
            Some(slot) => {
                *slot = employee.clone();
                Ok(())
            }
            None => Err(missing("employee", employee.id)),
        }
    }

    async fn get_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        Ok(self.tables.read().await.employees.get(&id).cloned())
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        Ok(self.tables.read().await.employees.values().cloned().collect())
    }

    async fn find_active_by_name(&self, name: &str) -> StoreResult<Vec<Employee>> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .values()
            .filter(|e| e.active && e.name == name)
            .cloned()
            .collect())
    }

    async fn active_names(&self) -> StoreResult<Vec<String>> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .values()
            .filter(|e| e.active)
            .map(|e| e.name.clone())
            .collect())
    }

    async fn employees_on_schedule(&self, schedule_id: u64) -> StoreResult<Vec<Employee>> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .values()
            .filter(|e| e.schedule_id == Some(schedule_id))
            .cloned()
            .collect())
    }

    async fn insert_client(&self, name: &str) -> StoreResult<Client> {
        let mut tables = self.tables.write().await;
        let key = client::name_key(name);
        if tables.clients.values().any(|c| client::name_key(&c.name) == key) {
            return Err(StoreError::Duplicate(name.to_string()));
        }
        let id = tables.next_id();
        let client = Client {
            id,
            name: name.to_string(),
        };
        tables.clients.insert(id, client.clone());
        Ok(client)
    }

    async fn update_client(&self, updated: &Client) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let key = client::name_key(&updated.name);
        if tables
            .clients
            .values()
            .any(|c| c.id != updated.id && client::name_key(&c.name) == key)
        {
            return Err(StoreError::Duplicate(updated.name.clone()));
        }
        match tables.clients.get_mut(&updated.id) {
            Some(slot) => {
                *slot = updated.clone();
                Ok(())
            }
            None => Err(missing("client", updated.id)),
        }
    }

    async fn get_client(&self, id: u64) -> StoreResult<Option<Client>> {
        Ok(self.tables.read().await.clients.get(&id).cloned())
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        Ok(self.tables.read().await.clients.values().cloned().collect())
    }

    async fn delete_client(&self, id: u64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.events.iter().any(|e| e.client_id == id) {
            return Err(StoreError::InUse(format!("client {id}")));
        }
        Ok(tables.clients.remove(&id).is_some())
    }

    async fn insert_schedule(&self, input: ScheduleInput) -> StoreResult<ScheduleType> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let schedule = ScheduleType {
            id,
            name: input.name,
            weekly_hours: input.weekly_hours,
            kind: input.kind,
            details: input.details,
        };
        tables.schedules.insert(id, schedule.clone());
        Ok(schedule)
    }

    async fn update_schedule(&self, schedule: &ScheduleType) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        match tables.schedules.get_mut(&schedule.id) {
            Some(slot) => {
                *slot = schedule.clone();
                Ok(())
            }
            None => Err(missing("schedule type", schedule.id)),
        }
    }

    async fn get_schedule(&self, id: u64) -> StoreResult<Option<ScheduleType>> {
        Ok(self.tables.read().await.schedules.get(&id).cloned())
    }

    async fn list_schedules(&self) -> StoreResult<Vec<ScheduleType>> {
        Ok(self.tables.read().await.schedules.values().cloned().collect())
    }

    async fn delete_schedule(&self, id: u64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.employees.values().any(|e| e.schedule_id == Some(id)) {
            return Err(StoreError::InUse(format!("schedule type {id}")));
        }
        Ok(tables.schedules.remove(&id).is_some())
    }

    async fn attendance_index(&self, employee_id: u64) -> StoreResult<AttendanceIndex> {
        Ok(self.tables.read().await.index_of(employee_id))
    }

    async fn attendance_indexes(&self) -> StoreResult<Vec<AttendanceIndex>> {
        let tables = self.tables.read().await;
        let mut indexes: Vec<_> = tables.indexes.values().cloned().collect();
        indexes.sort_by_key(|i| i.employee_id);
        Ok(indexes)
    }

    async fn append_event(
        &self,
        event: NewClockEvent,
        expected_last: Option<u64>,
    ) -> StoreResult<ClockEvent> {
        let mut tables = self.tables.write().await;
        if !tables
            .employees
            .get(&event.employee_id)
            .is_some_and(|e| e.active)
        {
            return Err(StoreError::Dangling(Reference::Employee));
        }
        if !tables.clients.contains_key(&event.client_id) {
            return Err(StoreError::Dangling(Reference::Client));
        }

        let current = tables.index_of(event.employee_id);
        if current.last_event_id() != expected_last {
            return Err(StoreError::Conflict(format!(
                "employee {} ledger moved past {:?}",
                event.employee_id, expected_last
            )));
        }

        let id = tables.next_id();
        let event = event.with_id(id);
        tables.events.push(event.clone());
        tables
            .indexes
            .insert(event.employee_id, current.advanced(event.clone()));
        Ok(event)
    }

    async fn events_for_employee(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ClockEvent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .events
            .iter()
            .filter(|e| e.employee_id == employee_id && e.recorded_at >= from && e.recorded_at <= to)
            .cloned()
            .collect())
    }

    async fn recent_events(&self, since: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ClockEvent>> {
        let tables = self.tables.read().await;
        let mut recent: Vec<_> = tables
            .events
            .iter()
            .filter(|e| e.recorded_at >= since)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at).then(b.id.cmp(&a.id)));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn ledger_snapshot(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        employee_id: Option<u64>,
    ) -> StoreResult<LedgerSnapshot> {
        let tables = self.tables.read().await;
        let wanted = |e: &&ClockEvent| employee_id.is_none_or(|id| e.employee_id == id);

        let mut carried: BTreeMap<u64, ClockEvent> = BTreeMap::new();
        let mut events = Vec::new();
        for event in tables.events.iter().filter(wanted) {
            if event.recorded_at < from {
                let newer = carried
                    .get(&event.employee_id)
                    .is_none_or(|prev| (prev.recorded_at, prev.id) < (event.recorded_at, event.id));
                if newer {
                    carried.insert(event.employee_id, event.clone());
                }
            } else if event.recorded_at <= to {
                events.push(event.clone());
            }
        }
        events.sort_by_key(|e| (e.employee_id, e.recorded_at, e.id));

        Ok(LedgerSnapshot {
            carried: carried.into_values().collect(),
            events,
        })
    }

    async fn insert_request(&self, request: NewRequest) -> StoreResult<Request> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let request = Request {
            id,
            employee_id: request.employee_id,
            kind: request.kind,
            start_date: request.start_date,
            end_date: request.end_date,
            comments: request.comments,
            status: RequestStatus::Pending,
            created_at: request.created_at,
            decided_at: None,
        };
        tables.requests.insert(id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: u64) -> StoreResult<Option<Request>> {
        Ok(self.tables.read().await.requests.get(&id).cloned())
    }

    async fn list_requests(&self, query: RequestQuery) -> StoreResult<Vec<Request>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<_> = tables
            .requests
            .values()
            .filter(|r| query.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| query.status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(requests)
    }

    async fn decide_request(
        &self,
        id: u64,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
    ) -> StoreResult<Option<Request>> {
        let mut tables = self.tables.write().await;
        let Some(request) = tables.requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.status != RequestStatus::Pending {
            return Err(StoreError::Conflict(request.status.to_string()));
        }
        request.status = status;
        request.decided_at = Some(decided_at);
        Ok(Some(request.clone()))
    }

    async fn count_requests(&self, status: RequestStatus) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.requests.values().filter(|r| r.status == status).count() as u64)
    }
}
