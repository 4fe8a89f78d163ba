use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument, warn};

use crate::clock::Clock;
use crate::error::{AppResult, ConflictError, NotFoundError, ValidationError};
use crate::model::{Actor, ClockEvent, Employee, EventKind, NewClockEvent, StatusView};
use crate::store::{Reference, Store, StoreError};

/// Lost compare-and-append races are retried this many times against the
/// fresh status before giving up.
const APPEND_ATTEMPTS: usize = 5;

pub struct AttendanceService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn clock_in(&self, actor: &Actor, employee_id: u64, client_id: Option<u64>) -> AppResult<ClockEvent> {
        actor.require_self_or_hr(employee_id)?;
        let client_id = client_id.ok_or(ValidationError::MissingClient)?;
        self.record(employee_id, EventKind::In, Some(client_id)).await
    }

    /// The client is optional; when given it must be the open session's.
    pub async fn clock_out(&self, actor: &Actor, employee_id: u64, client_id: Option<u64>) -> AppResult<ClockEvent> {
        actor.require_self_or_hr(employee_id)?;
        self.record(employee_id, EventKind::Out, client_id).await
    }

    pub async fn pause(&self, actor: &Actor, employee_id: u64) -> AppResult<ClockEvent> {
        actor.require_self_or_hr(employee_id)?;
        self.record(employee_id, EventKind::Pause, None).await
    }

    pub async fn resume(&self, actor: &Actor, employee_id: u64) -> AppResult<ClockEvent> {
        actor.require_self_or_hr(employee_id)?;
        self.record(employee_id, EventKind::Resume, None).await
    }

    /// Reads the committed status index, so it reflects every acknowledged append.
    pub async fn status(&self, actor: &Actor, employee_id: u64) -> AppResult<StatusView> {
        actor.require_self_or_hr(employee_id)?;
        self.require_employee(employee_id).await?;
        let index = self.store.attendance_index(employee_id).await?;
        Ok(StatusView::from(&index))
    }

    /// The employee's own events in `[from, to]`, oldest first.
    pub async fn history(
        &self,
        actor: &Actor,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<ClockEvent>> {
        actor.require_self_or_hr(employee_id)?;
        if from >= to {
            return Err(ValidationError::InvalidRange.into());
        }
        self.require_employee(employee_id).await?;
        Ok(self.store.events_for_employee(employee_id, from, to).await?)
    }

    /// Validates `kind` against the employee's current status and appends it.
    /// Nothing is written when the transition is invalid.
    #[instrument(name = "record_clock_event", skip(self), fields(kind = %kind))]
    pub async fn record(&self, employee_id: u64, kind: EventKind, client_id: Option<u64>) -> AppResult<ClockEvent> {
        let employee = self.require_employee(employee_id).await?;
        if !employee.active {
            return Err(NotFoundError::Employee(employee_id).into());
        }
        if kind == EventKind::In {
            let client_id = client_id.ok_or(ValidationError::MissingClient)?;
            if self.store.get_client(client_id).await?.is_none() {
                return Err(NotFoundError::Client(client_id).into());
            }
        }

        for attempt in 1..=APPEND_ATTEMPTS {
            let index = self.store.attendance_index(employee_id).await?;
            index.status().apply(kind)?;

            let session_client = match kind {
                EventKind::In => client_id.ok_or(ValidationError::MissingClient)?,
                _ => {
                    let open = index
                        .session_client_id
                        .or_else(|| index.last_event.as_ref().map(|e| e.client_id))
                        .ok_or(ValidationError::MissingClient)?;
                    if let Some(given) = client_id.filter(|given| *given != open) {
                        return Err(ValidationError::ClientMismatch { open, given }.into());
                    }
                    open
                }
            };

            // Never earlier than the previous event, even if the clock stepped back.
            let now = self.clock.now();
            let recorded_at = match &index.last_event {
                Some(last) if last.recorded_at > now => last.recorded_at,
                _ => now,
            };

            let event = NewClockEvent {
                employee_id,
                client_id: session_client,
                kind,
                recorded_at,
            };

            match self.store.append_event(event, index.last_event_id()).await {
                Ok(event) => {
                    info!(
                        employee_id,
                        event_id = event.id,
                        client_id = event.client_id,
                        "Clock event recorded"
                    );
                    return Ok(event);
                }
                Err(StoreError::Conflict(reason)) => {
                    debug!(attempt, %reason, "Retrying append against fresh status");
                }
                // Deactivated or deleted while this append was in flight.
                Err(StoreError::Dangling(Reference::Employee)) => {
                    return Err(NotFoundError::Employee(employee_id).into());
                }
                Err(StoreError::Dangling(Reference::Client)) => {
                    return Err(NotFoundError::Client(session_client).into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(employee_id, "Gave up appending after repeated conflicts");
        Err(ConflictError::ConcurrentModification.into())
    }

    async fn require_employee(&self, employee_id: u64) -> AppResult<Employee> {
        self.store
            .get_employee(employee_id)
            .await?
            .ok_or_else(|| NotFoundError::Employee(employee_id).into())
    }
}
