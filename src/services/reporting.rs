//! Worked-hours aggregation.
//!
//! `summarize` is a pure function of a ledger snapshot, directory data, the
//! scope and "now". The service around it only gathers those inputs under a
//! deadline.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as Span, FixedOffset, Utc};
use tracing::{info, instrument, warn};

use crate::clock::Clock;
use crate::error::{AppError, AppResult};
use crate::model::report::{
    Anomaly, ClientHours, Dashboard, EmployeeHours, EmployeeShare, FleetStats, ReportScope, Summary,
};
use crate::model::{
    Actor, ActivityEntry, AttendanceIndex, AttendanceStatus, Client, ClockEvent, Employee,
    RequestStatus, ScheduleType,
};
use crate::store::{LedgerSnapshot, Store};

const MS_PER_HOUR: f64 = 3_600_000.0;
const RECENT_ACTIVITY_DAYS: i64 = 5;
const RECENT_ACTIVITY_LIMIT: usize = 10;

/// Everything `summarize` reads.
pub struct ReportInput<'a> {
    pub scope: ReportScope,
    pub snapshot: &'a LedgerSnapshot,
    pub employees: &'a [Employee],
    pub clients: &'a [Client],
    pub schedules: &'a [ScheduleType],
    pub fleet: FleetStats,
    pub now: DateTime<Utc>,
}

#[derive(Default)]
struct Tally {
    total_ms: i64,
    by_client: BTreeMap<u64, i64>,
    open: bool,
}

/// Replays one employee's events through the state machine, adding every
/// working interval clipped to the scope.
fn tally_employee(
    scope: &ReportScope,
    now: DateTime<Utc>,
    carried: Option<&ClockEvent>,
    events: &[&ClockEvent],
    anomalies: &mut Vec<Anomaly>,
) -> Tally {
    let mut tally = Tally::default();
    let horizon = now.min(scope.to);

    let add = |start: DateTime<Utc>, end: DateTime<Utc>, client_id: u64, tally: &mut Tally| {
        if scope.client_id.is_some_and(|wanted| wanted != client_id) {
            return;
        }
        let start = start.max(scope.from);
        let end = end.min(scope.to);
        let ms = (end - start).num_milliseconds();
        if ms > 0 {
            tally.total_ms += ms;
            *tally.by_client.entry(client_id).or_default() += ms;
        }
    };

    let mut status = AttendanceStatus::after(carried.map(|e| e.kind));
    let mut open: Option<(DateTime<Utc>, u64)> = carried
        .filter(|e| e.kind.opens_interval())
        .map(|e| (scope.from, e.client_id));

    for event in events {
        match status.apply(event.kind) {
            Ok(next) => status = next,
            Err(e) => {
                anomalies.push(Anomaly {
                    event_id: event.id,
                    employee_id: event.employee_id,
                    reason: e.to_string(),
                });
                continue;
            }
        }

        if event.kind.opens_interval() {
            open = Some((event.recorded_at, event.client_id));
        } else if let Some((start, client_id)) = open.take() {
            add(start, event.recorded_at, client_id, &mut tally);
        }
    }

    if let Some((start, client_id)) = open {
        add(start, horizon, client_id, &mut tally);
        tally.open = scope.client_id.is_none_or(|wanted| wanted == client_id);
    }

    tally
}

fn hours(ms: i64) -> f64 {
    ms as f64 / MS_PER_HOUR
}

pub fn summarize(input: ReportInput<'_>) -> Summary {
    let ReportInput {
        scope,
        snapshot,
        employees,
        clients,
        schedules,
        fleet,
        now,
    } = input;

    let in_scope = |employee_id: u64| scope.employee_id.is_none_or(|id| id == employee_id);

    let carried: HashMap<u64, &ClockEvent> = snapshot
        .carried
        .iter()
        .filter(|e| in_scope(e.employee_id))
        .map(|e| (e.employee_id, e))
        .collect();

    let mut per_employee: BTreeMap<u64, Vec<&ClockEvent>> = BTreeMap::new();
    for event in snapshot.events.iter().filter(|e| in_scope(e.employee_id)) {
        per_employee.entry(event.employee_id).or_default().push(event);
    }
    for employee_id in carried.keys() {
        per_employee.entry(*employee_id).or_default();
    }
    for events in per_employee.values_mut() {
        events.sort_by_key(|e| (e.recorded_at, e.id));
    }

    let mut anomalies = Vec::new();
    let tallies: BTreeMap<u64, Tally> = per_employee
        .iter()
        .map(|(employee_id, events)| {
            let tally = tally_employee(
                &scope,
                now,
                carried.get(employee_id).copied(),
                events,
                &mut anomalies,
            );
            (*employee_id, tally)
        })
        .collect();
    anomalies.sort_by_key(|a| (a.employee_id, a.event_id));

    let directory: HashMap<u64, &Employee> = employees.iter().map(|e| (e.id, e)).collect();
    let schedule_by_id: HashMap<u64, &ScheduleType> = schedules.iter().map(|s| (s.id, s)).collect();
    let client_names: HashMap<u64, &str> = clients.iter().map(|c| (c.id, c.name.as_str())).collect();
    let name_of = |employee_id: u64| {
        directory
            .get(&employee_id)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| format!("#{employee_id}"))
    };

    // Rows: everyone with booked time, plus every active employee in scope
    // when the report is not narrowed to a client.
    let mut rows: BTreeMap<u64, EmployeeHours> = BTreeMap::new();
    if scope.client_id.is_none() {
        for employee in employees.iter().filter(|e| in_scope(e.id)) {
            if employee.active || scope.employee_id == Some(employee.id) {
                rows.entry(employee.id).or_insert_with(|| EmployeeHours {
                    employee_id: employee.id,
                    name: employee.name.clone(),
                    hours: 0.0,
                    open: false,
                    target_hours: None,
                });
            }
        }
    }

    let mut client_ms: BTreeMap<u64, (i64, Vec<EmployeeShare>)> = BTreeMap::new();
    let mut total_ms = 0i64;
    for (employee_id, tally) in &tallies {
        if tally.total_ms == 0 && !tally.open && !rows.contains_key(employee_id) {
            continue;
        }
        total_ms += tally.total_ms;
        let row = rows.entry(*employee_id).or_insert_with(|| EmployeeHours {
            employee_id: *employee_id,
            name: name_of(*employee_id),
            hours: 0.0,
            open: false,
            target_hours: None,
        });
        row.hours = hours(tally.total_ms);
        row.open = tally.open;

        for (client_id, ms) in &tally.by_client {
            let entry = client_ms.entry(*client_id).or_default();
            entry.0 += ms;
            entry.1.push(EmployeeShare {
                employee_id: *employee_id,
                name: row.name.clone(),
                hours: hours(*ms),
            });
        }
    }

    let days = scope.days();
    for row in rows.values_mut() {
        row.target_hours = directory
            .get(&row.employee_id)
            .and_then(|e| e.schedule_id)
            .and_then(|id| schedule_by_id.get(&id))
            .map(|s| s.target_hours(days));
    }

    let clients = client_ms
        .into_iter()
        .map(|(client_id, (ms, employees))| ClientHours {
            client_id,
            name: client_names
                .get(&client_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| format!("#{client_id}")),
            hours: hours(ms),
            employees,
        })
        .collect();

    Summary {
        scope,
        total_hours: hours(total_ms),
        employees: rows.into_values().collect(),
        clients,
        anomalies,
        fleet,
    }
}

/// Active employees, open sessions that started on the local `now` date,
/// and the pending request count.
pub fn fleet_stats(
    employees: &[Employee],
    indexes: &[AttendanceIndex],
    pending_requests: u64,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> FleetStats {
    let active: HashMap<u64, &Employee> = employees
        .iter()
        .filter(|e| e.active)
        .map(|e| (e.id, e))
        .collect();
    let today = now.with_timezone(&offset).date_naive();

    let active_today = indexes
        .iter()
        .filter(|i| active.contains_key(&i.employee_id) && i.status().is_open())
        .filter(|i| {
            i.session_started_at
                .is_some_and(|at| at.with_timezone(&offset).date_naive() == today)
        })
        .count();

    FleetStats {
        total_employees: active.len(),
        active_today,
        pending_requests,
    }
}

pub struct ReportingService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    timeout: Duration,
    offset: FixedOffset,
}

impl ReportingService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, timeout: Duration, offset: FixedOffset) -> Self {
        Self {
            store,
            clock,
            timeout,
            offset,
        }
    }

    /// HR may report on anyone; employees only on themselves.
    #[instrument(skip(self, actor), fields(actor = actor.employee_id))]
    pub async fn summarize(&self, actor: &Actor, scope: ReportScope) -> AppResult<Summary> {
        if !actor.is_hr() {
            match scope.employee_id {
                Some(id) => actor.require_self_or_hr(id)?,
                None => actor.require_hr()?,
            }
        }
        scope.validate()?;

        let summary = self.with_deadline(self.build_summary(scope)).await?;
        info!(
            total_hours = summary.total_hours,
            employees = summary.employees.len(),
            anomalies = summary.anomalies.len(),
            "Summary generated"
        );
        Ok(summary)
    }

    pub async fn dashboard(&self, actor: &Actor) -> AppResult<Dashboard> {
        actor.require_hr()?;
        self.with_deadline(self.build_dashboard()).await
    }

    async fn with_deadline<T>(&self, work: impl Future<Output = AppResult<T>>) -> AppResult<T> {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Report generation timed out");
                Err(AppError::Cancelled)
            }
        }
    }

    async fn fleet(&self, employees: &[Employee], now: DateTime<Utc>) -> AppResult<FleetStats> {
        let indexes = self.store.attendance_indexes().await?;
        let pending = self.store.count_requests(RequestStatus::Pending).await?;
        Ok(fleet_stats(employees, &indexes, pending, now, self.offset))
    }

    async fn build_summary(&self, scope: ReportScope) -> AppResult<Summary> {
        let now = self.clock.now();
        let snapshot = self
            .store
            .ledger_snapshot(scope.from, scope.to, scope.employee_id)
            .await?;
        let employees = self.store.list_employees().await?;
        let clients = self.store.list_clients().await?;
        let schedules = self.store.list_schedules().await?;
        let fleet = self.fleet(&employees, now).await?;

        Ok(summarize(ReportInput {
            scope,
            snapshot: &snapshot,
            employees: &employees,
            clients: &clients,
            schedules: &schedules,
            fleet,
            now,
        }))
    }

    async fn build_dashboard(&self) -> AppResult<Dashboard> {
        let now = self.clock.now();
        let employees = self.store.list_employees().await?;
        let fleet = self.fleet(&employees, now).await?;

        let since = now - Span::days(RECENT_ACTIVITY_DAYS);
        let recent = self.store.recent_events(since, RECENT_ACTIVITY_LIMIT).await?;
        let clients = self.store.list_clients().await?;
        let recent_activity = join_names(recent, &employees, &clients);

        Ok(Dashboard {
            fleet,
            recent_activity,
        })
    }
}

/// Attaches employee and client display names to ledger events.
pub fn join_names(events: Vec<ClockEvent>, employees: &[Employee], clients: &[Client]) -> Vec<ActivityEntry> {
    let employee_names: HashMap<u64, &str> = employees.iter().map(|e| (e.id, e.name.as_str())).collect();
    let client_names: HashMap<u64, &str> = clients.iter().map(|c| (c.id, c.name.as_str())).collect();

    events
        .into_iter()
        .map(|event| ActivityEntry {
            employee_name: employee_names
                .get(&event.employee_id)
                .map(|n| n.to_string())
                .unwrap_or_default(),
            client_name: client_names
                .get(&event.client_id)
                .map(|n| n.to_string())
                .unwrap_or_default(),
            event,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, Role, ScheduleKind};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    fn employee(id: u64, name: &str, schedule_id: Option<u64>) -> Employee {
        Employee {
            id,
            name: name.into(),
            pin_hash: String::new(),
            avatar_url: None,
            schedule_id,
            role: Role::Employee,
            vacation_days: 22,
            active: true,
            created_at: t(0, 0),
        }
    }

    fn ev(id: u64, employee_id: u64, client_id: u64, kind: EventKind, at: DateTime<Utc>) -> ClockEvent {
        ClockEvent {
            id,
            employee_id,
            client_id,
            kind,
            recorded_at: at,
        }
    }

    fn scope(from: DateTime<Utc>, to: DateTime<Utc>) -> ReportScope {
        ReportScope {
            from,
            to,
            client_id: None,
            employee_id: None,
        }
    }

    fn run(scope: ReportScope, snapshot: &LedgerSnapshot, employees: &[Employee], now: DateTime<Utc>) -> Summary {
        let clients = vec![
            Client { id: 1, name: "Cliente A".into() },
            Client { id: 2, name: "Cliente B".into() },
        ];
        let schedules = vec![ScheduleType {
            id: 7,
            name: "Full time".into(),
            weekly_hours: 40.0,
            kind: ScheduleKind::Open,
            details: Default::default(),
        }];
        summarize(ReportInput {
            scope,
            snapshot,
            employees,
            clients: &clients,
            schedules: &schedules,
            fleet: FleetStats::default(),
            now,
        })
    }

    #[test]
    fn empty_range_is_all_zero() {
        let employees = vec![employee(1, "Juanjo", None)];
        let summary = run(scope(t(8, 0), t(9, 0)), &LedgerSnapshot::default(), &employees, t(12, 0));
        assert_eq!(summary.total_hours, 0.0);
        assert!(summary.employees.iter().all(|e| e.hours == 0.0));
        assert!(summary.clients.is_empty());
    }

    #[test]
    fn matched_pair_counts_its_duration() {
        let employees = vec![employee(1, "Juanjo", None)];
        let snapshot = LedgerSnapshot {
            carried: vec![],
            events: vec![ev(1, 1, 1, EventKind::In, t(8, 0)), ev(2, 1, 1, EventKind::Out, t(10, 0))],
        };
        let mut s = scope(t(7, 0), t(11, 0));
        s.employee_id = Some(1);

        let summary = run(s, &snapshot, &employees, t(12, 0));
        assert_eq!(summary.total_hours, 2.0);
        assert_eq!(summary.employees[0].hours, 2.0);
        assert_eq!(summary.clients[0].name, "Cliente A");
        assert_eq!(summary.clients[0].employees[0].hours, 2.0);
    }

    #[test]
    fn breaks_are_not_worked_time() {
        let employees = vec![employee(1, "Ana", None)];
        let snapshot = LedgerSnapshot {
            carried: vec![],
            events: vec![
                ev(1, 1, 1, EventKind::In, t(8, 0)),
                ev(2, 1, 1, EventKind::Pause, t(10, 0)),
                ev(3, 1, 1, EventKind::Resume, t(10, 30)),
                ev(4, 1, 1, EventKind::Out, t(12, 0)),
            ],
        };
        let summary = run(scope(t(0, 0), t(23, 0)), &snapshot, &employees, t(23, 0));
        assert_eq!(summary.total_hours, 3.5);
    }

    #[test]
    fn intervals_are_clipped_and_seeded_from_carried_state() {
        let employees = vec![employee(1, "Ana", None)];
        let snapshot = LedgerSnapshot {
            carried: vec![ev(1, 1, 1, EventKind::In, t(6, 0))],
            events: vec![ev(2, 1, 1, EventKind::Out, t(12, 0))],
        };
        let summary = run(scope(t(9, 0), t(11, 0)), &snapshot, &employees, t(13, 0));
        // 09:00 to 11:00; the out falls outside but the range still closes it
        assert_eq!(summary.total_hours, 2.0);
    }

    #[test]
    fn open_interval_counts_up_to_now() {
        let employees = vec![employee(1, "Ana", None)];
        let snapshot = LedgerSnapshot {
            carried: vec![],
            events: vec![ev(1, 1, 2, EventKind::In, t(8, 0))],
        };
        let summary = run(scope(t(0, 0), t(20, 0)), &snapshot, &employees, t(9, 30));
        assert_eq!(summary.total_hours, 1.5);
        assert!(summary.employees[0].open);
    }

    #[test]
    fn client_scope_filters_intervals() {
        let employees = vec![employee(1, "Ana", None), employee(2, "Luis", None)];
        let snapshot = LedgerSnapshot {
            carried: vec![],
            events: vec![
                ev(1, 1, 1, EventKind::In, t(8, 0)),
                ev(2, 1, 1, EventKind::Out, t(9, 0)),
                ev(3, 1, 2, EventKind::In, t(10, 0)),
                ev(4, 1, 2, EventKind::Out, t(12, 0)),
                ev(5, 2, 2, EventKind::In, t(8, 0)),
                ev(6, 2, 2, EventKind::Out, t(9, 0)),
            ],
        };
        let mut s = scope(t(0, 0), t(23, 0));
        s.client_id = Some(2);

        let summary = run(s, &snapshot, &employees, t(23, 0));
        assert_eq!(summary.total_hours, 3.0);
        assert_eq!(summary.clients.len(), 1);
        assert_eq!(summary.clients[0].client_id, 2);
        let hours: Vec<_> = summary.employees.iter().map(|e| (e.employee_id, e.hours)).collect();
        assert_eq!(hours, vec![(1, 2.0), (2, 1.0)]);
    }

    #[test]
    fn anomalies_are_skipped_and_reported() {
        let employees = vec![employee(1, "Ana", None)];
        let snapshot = LedgerSnapshot {
            carried: vec![],
            events: vec![
                ev(1, 1, 1, EventKind::In, t(8, 0)),
                ev(2, 1, 1, EventKind::In, t(9, 0)),
                ev(3, 1, 1, EventKind::Out, t(10, 0)),
                ev(4, 1, 1, EventKind::Out, t(11, 0)),
            ],
        };
        let summary = run(scope(t(0, 0), t(23, 0)), &snapshot, &employees, t(23, 0));
        assert_eq!(summary.total_hours, 2.0);
        let ids: Vec<_> = summary.anomalies.iter().map(|a| a.event_id).collect();
        assert_eq!(ids, vec![2, 4]);
    }

    #[test]
    fn target_hours_follow_schedule() {
        let employees = vec![employee(1, "Ana", Some(7))];
        let from = t(0, 0);
        let summary = run(scope(from, from + Span::days(7)), &LedgerSnapshot::default(), &employees, from);
        assert_eq!(summary.employees[0].target_hours, Some(40.0));
    }

    #[test]
    fn fleet_counts_sessions_started_today() {
        let employees = vec![employee(1, "Ana", None), employee(2, "Luis", None)];
        let today = AttendanceIndex::empty(1).advanced(ev(1, 1, 1, EventKind::In, t(8, 0)));
        let yesterday = AttendanceIndex::empty(2)
            .advanced(ev(2, 2, 1, EventKind::In, t(8, 0) - Span::days(1)));
        let offset = FixedOffset::east_opt(0).unwrap();

        let stats = fleet_stats(&employees, &[today, yesterday], 3, t(12, 0), offset);
        assert_eq!(
            stats,
            FleetStats {
                total_employees: 2,
                active_today: 1,
                pending_requests: 3
            }
        );
    }
}
