use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::TryStreamExt;
use sqlx::mysql::MySqlDatabaseError;
use sqlx::{FromRow, MySqlPool};
use tracing::{debug, warn};

use super::{LedgerSnapshot, Reference, RequestQuery, Store, StoreError, StoreResult};
use crate::model::{
    AttendanceIndex, Client, ClockEvent, Employee, EventKind, NewClockEvent, Request,
    RequestStatus, Role, ScheduleKind, ScheduleType,
    employee::NewEmployee,
    request::{NewRequest, RequestKind},
    schedule_type::ScheduleInput,
};

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                return StoreError::Duplicate(db_err.message().to_string());
            }
            if db_err.is_foreign_key_violation() {
                // 1452: the child row points at a parent that is gone.
                let number = db_err
                    .try_downcast_ref::<MySqlDatabaseError>()
                    .map(MySqlDatabaseError::number);
                if number == Some(1452) {
                    if let Some(reference) = dangling_reference(db_err.message()) {
                        return StoreError::Dangling(reference);
                    }
                }
                return StoreError::InUse(db_err.message().to_string());
            }
            // deadlock / serialization failure
            if db_err.code().as_deref() == Some("40001") {
                return StoreError::Conflict(db_err.message().to_string());
            }
        }
        StoreError::Backend(e.to_string())
    }
}

/// Maps the violated constraint named in a MySQL error to the parent it guards.
fn dangling_reference(message: &str) -> Option<Reference> {
    if message.contains("fk_employees_schedule") {
        Some(Reference::ScheduleType)
    } else if message.contains("fk_clock_events_client") {
        Some(Reference::Client)
    } else if message.contains("_employee`") {
        Some(Reference::Employee)
    } else {
        None
    }
}

fn decode<T: FromStr>(column: &str, raw: &str) -> StoreResult<T> {
    raw.parse()
        .map_err(|_| StoreError::Backend(format!("unexpected {column} value '{raw}'")))
}

#[derive(FromRow)]
struct EmployeeRow {
    id: u64,
    name: String,
    pin_hash: String,
    avatar_url: Option<String>,
    schedule_id: Option<u64>,
    role_id: u8,
    vacation_days: u32,
    active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<EmployeeRow> for Employee {
    type Error = StoreError;

    fn try_from(row: EmployeeRow) -> StoreResult<Self> {
        let role = Role::from_id(row.role_id)
            .ok_or_else(|| StoreError::Backend(format!("unknown role id {}", row.role_id)))?;
        Ok(Employee {
            id: row.id,
            name: row.name,
            pin_hash: row.pin_hash,
            avatar_url: row.avatar_url,
            schedule_id: row.schedule_id,
            role,
            vacation_days: row.vacation_days,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

const EMPLOYEE_COLUMNS: &str =
    "id, name, pin_hash, avatar_url, schedule_id, role_id, vacation_days, active, created_at";

#[derive(FromRow)]
struct ScheduleRow {
    id: u64,
    name: String,
    weekly_hours: f64,
    kind: String,
    details: String,
}

impl TryFrom<ScheduleRow> for ScheduleType {
    type Error = StoreError;

    fn try_from(row: ScheduleRow) -> StoreResult<Self> {
        let details: BTreeMap<String, String> = serde_json::from_str(&row.details)
            .map_err(|e| StoreError::Backend(format!("schedule {} details: {e}", row.id)))?;
        Ok(ScheduleType {
            id: row.id,
            name: row.name,
            weekly_hours: row.weekly_hours,
            kind: decode::<ScheduleKind>("schedule kind", &row.kind)?,
            details,
        })
    }
}

#[derive(FromRow)]
struct EventRow {
    id: u64,
    employee_id: u64,
    client_id: u64,
    kind: String,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for ClockEvent {
    type Error = StoreError;

    fn try_from(row: EventRow) -> StoreResult<Self> {
        Ok(ClockEvent {
            id: row.id,
            employee_id: row.employee_id,
            client_id: row.client_id,
            kind: decode::<EventKind>("event kind", &row.kind)?,
            recorded_at: row.recorded_at,
        })
    }
}

const EVENT_COLUMNS: &str = "id, employee_id, client_id, kind, recorded_at";

#[derive(FromRow)]
struct IndexRow {
    employee_id: u64,
    session_client_id: Option<u64>,
    session_started_at: Option<DateTime<Utc>>,
    event_id: Option<u64>,
    event_client_id: Option<u64>,
    event_kind: Option<String>,
    event_recorded_at: Option<DateTime<Utc>>,
}

impl TryFrom<IndexRow> for AttendanceIndex {
    type Error = StoreError;

    fn try_from(row: IndexRow) -> StoreResult<Self> {
        let last_event = match (
            row.event_id,
            row.event_client_id,
            row.event_kind,
            row.event_recorded_at,
        ) {
            (Some(id), Some(client_id), Some(kind), Some(recorded_at)) => Some(ClockEvent {
                id,
                employee_id: row.employee_id,
                client_id,
                kind: decode::<EventKind>("event kind", &kind)?,
                recorded_at,
            }),
            _ => None,
        };
        Ok(AttendanceIndex {
            employee_id: row.employee_id,
            last_event,
            session_client_id: row.session_client_id,
            session_started_at: row.session_started_at,
        })
    }
}

const INDEX_SELECT: &str = r#"
    SELECT s.employee_id, s.session_client_id, s.session_started_at,
           e.id AS event_id, e.client_id AS event_client_id,
           e.kind AS event_kind, e.recorded_at AS event_recorded_at
    FROM attendance_status s
    LEFT JOIN clock_events e ON e.id = s.last_event_id
"#;

#[derive(FromRow)]
struct RequestRow {
    id: u64,
    employee_id: u64,
    kind: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    comments: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<RequestRow> for Request {
    type Error = StoreError;

    fn try_from(row: RequestRow) -> StoreResult<Self> {
        Ok(Request {
            id: row.id,
            employee_id: row.employee_id,
            kind: decode::<RequestKind>("request kind", &row.kind)?,
            start_date: row.start_date,
            end_date: row.end_date,
            comments: row.comments,
            status: decode::<RequestStatus>("request status", &row.status)?,
            created_at: row.created_at,
            decided_at: row.decided_at,
        })
    }
}

const REQUEST_COLUMNS: &str =
    "id, employee_id, kind, start_date, end_date, comments, status, created_at, decided_at";

fn convert_all<R, T>(rows: Vec<R>) -> StoreResult<Vec<T>>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// MySQL-backed store. Appends lock the employee's `attendance_status` row,
/// so different employees never contend.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn insert_employee(&self, employee: NewEmployee) -> StoreResult<Employee> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query(
            r#"
            INSERT INTO employees
                (name, pin_hash, avatar_url, schedule_id, role_id, vacation_days, active, created_at)
            VALUES (?, ?, ?, ?, ?, ?, TRUE, ?)
            "#,
        )
        .bind(&employee.name)
        .bind(&employee.pin_hash)
        .bind(&employee.avatar_url)
        .bind(employee.schedule_id)
        .bind(employee.role.id())
        .bind(employee.vacation_days)
        .bind(employee.created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        sqlx::query("INSERT INTO attendance_status (employee_id) VALUES (?)")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Employee {
            id,
            name: employee.name,
            pin_hash: employee.pin_hash,
            avatar_url: employee.avatar_url,
            schedule_id: employee.schedule_id,
            role: employee.role,
            vacation_days: employee.vacation_days,
            active: true,
            created_at: employee.created_at,
        })
    }

    async fn update_employee(&self, employee: &Employee) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        if !employee.active {
            // Same row lock appends take, so a clock-in cannot slip past.
            let current = sqlx::query_as::<_, (Option<u64>, bool)>(
                r#"
                SELECT s.session_client_id, e.active
                FROM attendance_status s JOIN employees e ON e.id = s.employee_id
                WHERE s.employee_id = ?
                FOR UPDATE OF s
                "#,
            )
            .bind(employee.id)
            .fetch_optional(&mut *tx)
            .await?;
            if let Some((Some(_), true)) = current {
                tx.rollback().await?;
                return Err(StoreError::SessionOpen(employee.id));
            }
        }

        sqlx::query(
            r#"
            UPDATE employees
            SET name = ?, pin_hash = ?, avatar_url = ?, schedule_id = ?,
                role_id = ?, vacation_days = ?, active = ?
            WHERE id = ?
            "#,
        )
        .bind(&employee.name)
        .bind(&employee.pin_hash)
        .bind(&employee.avatar_url)
        .bind(employee.schedule_id)
        .bind(employee.role.id())
        .bind(employee.vacation_days)
        .bind(employee.active)
        .bind(employee.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_employee(&self, id: u64) -> StoreResult<Option<Employee>> {
        let row = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Employee::try_from).transpose()
    }

    async fn list_employees(&self) -> StoreResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn find_active_by_name(&self, name: &str) -> StoreResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE name = ? AND active = TRUE"
        ))
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn active_names(&self) -> StoreResult<Vec<String>> {
        let mut stream = sqlx::query_as::<_, (String,)>("SELECT name FROM employees WHERE active = TRUE")
            .fetch(&self.pool);

        let mut names = Vec::new();
        while let Some((name,)) = stream.try_next().await? {
            names.push(name);
        }
        Ok(names)
    }

    async fn employees_on_schedule(&self, schedule_id: u64) -> StoreResult<Vec<Employee>> {
        let rows = sqlx::query_as::<_, EmployeeRow>(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE schedule_id = ? ORDER BY id"
        ))
        .bind(schedule_id)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn insert_client(&self, name: &str) -> StoreResult<Client> {
        let id = sqlx::query("INSERT INTO clients (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?
            .last_insert_id();
        Ok(Client {
            id,
            name: name.to_string(),
        })
    }

    async fn update_client(&self, client: &Client) -> StoreResult<()> {
        sqlx::query("UPDATE clients SET name = ? WHERE id = ?")
            .bind(&client.name)
            .bind(client.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_client(&self, id: u64) -> StoreResult<Option<Client>> {
        let row = sqlx::query_as::<_, (u64, String)>("SELECT id, name FROM clients WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(id, name)| Client { id, name }))
    }

    async fn list_clients(&self) -> StoreResult<Vec<Client>> {
        let rows = sqlx::query_as::<_, (u64, String)>("SELECT id, name FROM clients ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(id, name)| Client { id, name }).collect())
    }

    async fn delete_client(&self, id: u64) -> StoreResult<bool> {
        // fk_clock_events_client turns a referenced delete into InUse
        let result = sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_schedule(&self, input: ScheduleInput) -> StoreResult<ScheduleType> {
        let details = serde_json::to_string(&input.details)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let id = sqlx::query(
            "INSERT INTO schedule_types (name, weekly_hours, kind, details) VALUES (?, ?, ?, ?)",
        )
        .bind(&input.name)
        .bind(input.weekly_hours)
        .bind(input.kind.as_ref())
        .bind(details)
        .execute(&self.pool)
        .await?
        .last_insert_id();

        Ok(ScheduleType {
            id,
            name: input.name,
            weekly_hours: input.weekly_hours,
            kind: input.kind,
            details: input.details,
        })
    }

    async fn update_schedule(&self, schedule: &ScheduleType) -> StoreResult<()> {
        let details = serde_json::to_string(&schedule.details)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        sqlx::query(
            "UPDATE schedule_types SET name = ?, weekly_hours = ?, kind = ?, details = ? WHERE id = ?",
        )
        .bind(&schedule.name)
        .bind(schedule.weekly_hours)
        .bind(schedule.kind.as_ref())
        .bind(details)
        .bind(schedule.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_schedule(&self, id: u64) -> StoreResult<Option<ScheduleType>> {
        let row = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, name, weekly_hours, kind, details FROM schedule_types WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ScheduleType::try_from).transpose()
    }

    async fn list_schedules(&self) -> StoreResult<Vec<ScheduleType>> {
        let rows = sqlx::query_as::<_, ScheduleRow>(
            "SELECT id, name, weekly_hours, kind, details FROM schedule_types ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn delete_schedule(&self, id: u64) -> StoreResult<bool> {
        // fk_employees_schedule turns a referenced delete into InUse
        let result = sqlx::query("DELETE FROM schedule_types WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn attendance_index(&self, employee_id: u64) -> StoreResult<AttendanceIndex> {
        let row = sqlx::query_as::<_, IndexRow>(&format!("{INDEX_SELECT} WHERE s.employee_id = ?"))
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => row.try_into(),
            None => Ok(AttendanceIndex::empty(employee_id)),
        }
    }

    async fn attendance_indexes(&self) -> StoreResult<Vec<AttendanceIndex>> {
        let rows = sqlx::query_as::<_, IndexRow>(&format!(
            "{INDEX_SELECT} WHERE s.last_event_id IS NOT NULL ORDER BY s.employee_id"
        ))
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn append_event(
        &self,
        event: NewClockEvent,
        expected_last: Option<u64>,
    ) -> StoreResult<ClockEvent> {
        let mut tx = self.pool.begin().await?;

        // Rows imported without a status row get one on first append.
        sqlx::query("INSERT IGNORE INTO attendance_status (employee_id) VALUES (?)")
            .bind(event.employee_id)
            .execute(&mut *tx)
            .await?;

        let (current,) = sqlx::query_as::<_, (Option<u64>,)>(
            "SELECT last_event_id FROM attendance_status WHERE employee_id = ? FOR UPDATE",
        )
        .bind(event.employee_id)
        .fetch_one(&mut *tx)
        .await?;

        let active =
            sqlx::query_as::<_, (bool,)>("SELECT active FROM employees WHERE id = ? FOR SHARE")
                .bind(event.employee_id)
                .fetch_optional(&mut *tx)
                .await?;
        if !matches!(active, Some((true,))) {
            tx.rollback().await?;
            return Err(StoreError::Dangling(Reference::Employee));
        }

        if current != expected_last {
            debug!(
                employee_id = event.employee_id,
                ?current,
                ?expected_last,
                "Append lost compare-and-append race"
            );
            tx.rollback().await?;
            return Err(StoreError::Conflict(format!(
                "employee {} ledger moved past {:?}",
                event.employee_id, expected_last
            )));
        }

        let id = sqlx::query(
            "INSERT INTO clock_events (employee_id, client_id, kind, recorded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(event.employee_id)
        .bind(event.client_id)
        .bind(event.kind.as_ref())
        .bind(event.recorded_at)
        .execute(&mut *tx)
        .await?
        .last_insert_id();

        let update = match event.kind {
            EventKind::In => sqlx::query(
                r#"
                UPDATE attendance_status
                SET last_event_id = ?, session_client_id = ?, session_started_at = ?
                WHERE employee_id = ?
                "#,
            )
            .bind(id)
            .bind(event.client_id)
            .bind(event.recorded_at),
            EventKind::Out => sqlx::query(
                r#"
                UPDATE attendance_status
                SET last_event_id = ?, session_client_id = NULL, session_started_at = NULL
                WHERE employee_id = ?
                "#,
            )
            .bind(id),
            EventKind::Pause | EventKind::Resume => {
                sqlx::query("UPDATE attendance_status SET last_event_id = ? WHERE employee_id = ?")
                    .bind(id)
            }
        };
        update.bind(event.employee_id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(event.with_id(id))
    }

    async fn events_for_employee(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> StoreResult<Vec<ClockEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM clock_events
            WHERE employee_id = ? AND recorded_at BETWEEN ? AND ?
            ORDER BY recorded_at, id
            "#
        ))
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn recent_events(&self, since: DateTime<Utc>, limit: usize) -> StoreResult<Vec<ClockEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM clock_events
            WHERE recorded_at >= ?
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?
            "#
        ))
        .bind(since)
        .bind(limit as u64)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn ledger_snapshot(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        employee_id: Option<u64>,
    ) -> StoreResult<LedgerSnapshot> {
        // Both reads share one repeatable-read transaction.
        let mut tx = self.pool.begin().await?;

        let carried = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM clock_events c
            WHERE c.id = (
                SELECT p.id FROM clock_events p
                WHERE p.employee_id = c.employee_id AND p.recorded_at < ?
                ORDER BY p.recorded_at DESC, p.id DESC
                LIMIT 1
            )
            AND (? IS NULL OR c.employee_id = ?)
            ORDER BY c.employee_id
            "#
        ))
        .bind(from)
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&mut *tx)
        .await?;

        let events = sqlx::query_as::<_, EventRow>(&format!(
            r#"
            SELECT {EVENT_COLUMNS} FROM clock_events
            WHERE recorded_at BETWEEN ? AND ?
            AND (? IS NULL OR employee_id = ?)
            ORDER BY employee_id, recorded_at, id
            "#
        ))
        .bind(from)
        .bind(to)
        .bind(employee_id)
        .bind(employee_id)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LedgerSnapshot {
            carried: convert_all(carried)?,
            events: convert_all(events)?,
        })
    }

    async fn insert_request(&self, request: NewRequest) -> StoreResult<Request> {
        let id = sqlx::query(
            r#"
            INSERT INTO requests (employee_id, kind, start_date, end_date, comments, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(request.employee_id)
        .bind(request.kind.as_ref())
        .bind(request.start_date)
        .bind(request.end_date)
        .bind(&request.comments)
        .bind(RequestStatus::Pending.as_ref())
        .bind(request.created_at)
        .execute(&self.pool)
        .await?
        .last_insert_id();

        Ok(Request {
            id,
            employee_id: request.employee_id,
            kind: request.kind,
            start_date: request.start_date,
            end_date: request.end_date,
            comments: request.comments,
            status: RequestStatus::Pending,
            created_at: request.created_at,
            decided_at: None,
        })
    }

    async fn get_request(&self, id: u64) -> StoreResult<Option<Request>> {
        let row = sqlx::query_as::<_, RequestRow>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Request::try_from).transpose()
    }

    async fn list_requests(&self, query: RequestQuery) -> StoreResult<Vec<Request>> {
        let status = query.status.map(|s| s.as_ref().to_string());
        let rows = sqlx::query_as::<_, RequestRow>(&format!(
            r#"
            SELECT {REQUEST_COLUMNS} FROM requests
            WHERE (? IS NULL OR employee_id = ?)
            AND (? IS NULL OR status = ?)
            ORDER BY created_at DESC, id DESC
            "#
        ))
        .bind(query.employee_id)
        .bind(query.employee_id)
        .bind(&status)
        .bind(&status)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn decide_request(
        &self,
        id: u64,
        status: RequestStatus,
        decided_at: DateTime<Utc>,
    ) -> StoreResult<Option<Request>> {
        let result = sqlx::query(
            "UPDATE requests SET status = ?, decided_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status.as_ref())
        .bind(decided_at)
        .bind(id)
        .bind(RequestStatus::Pending.as_ref())
        .execute(&self.pool)
        .await?;

        let current = self.get_request(id).await?;
        if result.rows_affected() == 0 {
            if let Some(request) = &current {
                warn!(request_id = id, status = %request.status, "Request already decided");
                return Err(StoreError::Conflict(request.status.to_string()));
            }
        }
        Ok(current)
    }

    async fn count_requests(&self, status: RequestStatus) -> StoreResult<u64> {
        let (count,) = sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM requests WHERE status = ?")
            .bind(status.as_ref())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }
}
