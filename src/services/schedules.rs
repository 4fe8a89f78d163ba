use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppResult, ConflictError, NotFoundError};
use crate::model::schedule_type::ScheduleInput;
use crate::model::{Actor, Employee, ScheduleType};
use crate::store::{Store, StoreError};

pub struct ScheduleService {
    store: Arc<dyn Store>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> AppResult<Vec<ScheduleType>> {
        Ok(self.store.list_schedules().await?)
    }

    pub async fn get(&self, id: u64) -> AppResult<ScheduleType> {
        self.store
            .get_schedule(id)
            .await?
            .ok_or_else(|| NotFoundError::ScheduleType(id).into())
    }

    pub async fn create(&self, actor: &Actor, input: ScheduleInput) -> AppResult<ScheduleType> {
        actor.require_hr()?;
        let schedule = self.store.insert_schedule(input.validated()?).await?;
        info!(schedule_id = schedule.id, name = %schedule.name, "Schedule type created");
        Ok(schedule)
    }

    pub async fn update(&self, actor: &Actor, id: u64, input: ScheduleInput) -> AppResult<ScheduleType> {
        actor.require_hr()?;
        let input = input.validated()?;
        self.get(id).await?;

        let schedule = ScheduleType {
            id,
            name: input.name,
            weekly_hours: input.weekly_hours,
            kind: input.kind,
            details: input.details,
        };
        self.store.update_schedule(&schedule).await?;
        info!(schedule_id = id, "Schedule type updated");
        Ok(schedule)
    }

    /// Rejected while any employee, active or not, is assigned to it.
    pub async fn delete(&self, actor: &Actor, id: u64) -> AppResult<()> {
        actor.require_hr()?;
        self.get(id).await?;

        let assigned = self.store.employees_on_schedule(id).await?;
        if !assigned.is_empty() {
            return Err(ConflictError::ScheduleInUse {
                employees: assigned.len(),
            }
            .into());
        }

        match self.store.delete_schedule(id).await {
            Ok(true) => {
                info!(schedule_id = id, "Schedule type deleted");
                Ok(())
            }
            Ok(false) => Err(NotFoundError::ScheduleType(id).into()),
            // An assignment raced in between the check and the delete.
            Err(StoreError::InUse(reason)) => {
                warn!(schedule_id = id, %reason, "Schedule type became referenced");
                let employees = self.store.employees_on_schedule(id).await?.len();
                Err(ConflictError::ScheduleInUse { employees }.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn employees_on_schedule(&self, actor: &Actor, id: u64) -> AppResult<Vec<Employee>> {
        actor.require_hr()?;
        self.get(id).await?;
        Ok(self.store.employees_on_schedule(id).await?)
    }
}
