use std::sync::Arc;

use tracing::info;

use crate::clock::Clock;
use crate::error::{AppResult, ConflictError, NotFoundError, ValidationError};
use crate::model::request::{
    CreateRequest, Decision, NewRequest, RequestFilter, VacationBalance,
};
use crate::model::{Actor, Request, RequestKind, RequestStatus};
use crate::store::{RequestQuery, Store, StoreError};

/// Leave and correction requests raised by employees and decided by HR.
pub struct RequestService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl RequestService {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, actor: &Actor, input: CreateRequest) -> AppResult<Request> {
        if input.start_date > input.end_date {
            return Err(ValidationError::InvalidDates(
                "start date must not be after end date".into(),
            )
            .into());
        }
        match self.store.get_employee(actor.employee_id).await? {
            Some(e) if e.active => {}
            _ => return Err(NotFoundError::Employee(actor.employee_id).into()),
        }

        let comments = input
            .comments
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        let request = self
            .store
            .insert_request(NewRequest {
                employee_id: actor.employee_id,
                kind: input.kind,
                start_date: input.start_date,
                end_date: input.end_date,
                comments,
                created_at: self.clock.now(),
            })
            .await?;

        info!(request_id = request.id, employee_id = actor.employee_id, kind = %request.kind, "Request created");
        Ok(request)
    }

    /// HR sees every request; employees only their own.
    pub async fn list(&self, actor: &Actor, filter: &RequestFilter) -> AppResult<Vec<Request>> {
        let employee_id = if actor.is_hr() {
            filter.employee_id
        } else {
            if let Some(other) = filter.employee_id {
                actor.require_self_or_hr(other)?;
            }
            Some(actor.employee_id)
        };

        Ok(self
            .store
            .list_requests(RequestQuery {
                employee_id,
                status: filter.status,
            })
            .await?)
    }

    pub async fn get(&self, actor: &Actor, id: u64) -> AppResult<Request> {
        let request = self
            .store
            .get_request(id)
            .await?
            .ok_or(NotFoundError::Request(id))?;
        actor.require_self_or_hr(request.employee_id)?;
        Ok(request)
    }

    /// Only pending requests can be decided.
    pub async fn decide(&self, actor: &Actor, id: u64, decision: Decision) -> AppResult<Request> {
        actor.require_hr()?;
        match self
            .store
            .decide_request(id, decision.status(), self.clock.now())
            .await
        {
            Ok(Some(request)) => {
                info!(request_id = id, status = %request.status, decided_by = actor.employee_id, "Request decided");
                Ok(request)
            }
            Ok(None) => Err(NotFoundError::Request(id).into()),
            Err(StoreError::Conflict(status)) => {
                Err(ConflictError::RequestAlreadyDecided(status).into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn pending_count(&self, actor: &Actor) -> AppResult<u64> {
        actor.require_hr()?;
        Ok(self.store.count_requests(RequestStatus::Pending).await?)
    }

    /// Annual allowance minus the days of approved vacation, both ends inclusive.
    pub async fn vacation_balance(&self, actor: &Actor, employee_id: u64) -> AppResult<VacationBalance> {
        actor.require_self_or_hr(employee_id)?;
        let employee = self
            .store
            .get_employee(employee_id)
            .await?
            .ok_or(NotFoundError::Employee(employee_id))?;

        let approved = self
            .store
            .list_requests(RequestQuery {
                employee_id: Some(employee_id),
                status: Some(RequestStatus::Approved),
            })
            .await?;
        let used: i64 = approved
            .iter()
            .filter(|r| r.kind == RequestKind::Vacation)
            .map(Request::days)
            .sum();

        Ok(VacationBalance {
            employee_id,
            allowance: employee.vacation_days,
            used,
            remaining: i64::from(employee.vacation_days) - used,
        })
    }
}

