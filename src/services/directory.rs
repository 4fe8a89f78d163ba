use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, instrument};

use crate::auth::password::{PinHasher, validate_pin};
use crate::clock::Clock;
use crate::error::{AppError, AppResult, ConflictError, NotFoundError, ValidationError};
use crate::model::employee::{
    CreateEmployee, DEFAULT_VACATION_DAYS, EmployeeFilter, NewEmployee, RosterEntry, UpdateEmployee,
};
use crate::model::{Actor, Employee, Role};
use crate::store::{Reference, Store, StoreError};
use crate::utils::NameFilter;

pub struct DirectoryService {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    hasher: PinHasher,
    names: Arc<NameFilter>,
    /// Serializes credential writes so two creates cannot both pass the
    /// duplicate check.
    writes: Mutex<()>,
}

impl DirectoryService {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        hasher: PinHasher,
        names: Arc<NameFilter>,
    ) -> Self {
        Self {
            store,
            clock,
            hasher,
            names,
            writes: Mutex::new(()),
        }
    }

    pub async fn list(&self, actor: &Actor, filter: &EmployeeFilter) -> AppResult<Vec<Employee>> {
        actor.require_hr()?;
        let employees = self.store.list_employees().await?;
        Ok(employees.into_iter().filter(|e| filter.matches(e)).collect())
    }

    pub async fn get(&self, actor: &Actor, id: u64) -> AppResult<Employee> {
        actor.require_self_or_hr(id)?;
        self.store
            .get_employee(id)
            .await?
            .ok_or_else(|| NotFoundError::Employee(id).into())
    }

    /// Active `employee`-role records, for the kiosk picker.
    pub async fn roster(&self) -> AppResult<Vec<RosterEntry>> {
        let employees = self.store.list_employees().await?;
        Ok(employees
            .iter()
            .filter(|e| e.active && e.role == Role::Employee)
            .map(RosterEntry::from)
            .collect())
    }

    #[instrument(skip(self, actor, input), fields(actor = actor.employee_id, name = %input.name.trim()))]
    pub async fn create(&self, actor: &Actor, input: CreateEmployee) -> AppResult<Employee> {
        actor.require_hr()?;

        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        validate_pin(&input.pin)?;
        if let Some(schedule_id) = input.schedule_id {
            self.require_schedule(schedule_id).await?;
        }

        let _guard = self.writes.lock().await;
        self.ensure_unique_credential(&name, &input.pin, None).await?;

        let employee = self
            .store
            .insert_employee(NewEmployee {
                pin_hash: self.hasher.hash(&input.pin)?,
                name,
                avatar_url: input.avatar_url,
                schedule_id: input.schedule_id,
                role: input.role.unwrap_or(Role::Employee),
                vacation_days: input.vacation_days.unwrap_or(DEFAULT_VACATION_DAYS),
                created_at: self.clock.now(),
            })
            .await
            .map_err(|e| schedule_gone(e, input.schedule_id))?;
        self.names.insert(&employee.name);

        info!(employee_id = employee.id, role = %employee.role, "Employee created");
        Ok(employee)
    }

    #[instrument(skip(self, actor, input), fields(actor = actor.employee_id))]
    pub async fn update(&self, actor: &Actor, id: u64, input: UpdateEmployee) -> AppResult<Employee> {
        actor.require_hr()?;

        let _guard = self.writes.lock().await;
        let current = self
            .store
            .get_employee(id)
            .await?
            .ok_or(NotFoundError::Employee(id))?;
        let mut updated = current.clone();

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            updated.name = name;
        }
        if let Some(pin) = &input.pin {
            validate_pin(pin)?;
        }
        if let Some(avatar_url) = input.avatar_url {
            updated.avatar_url = avatar_url;
        }
        if let Some(schedule_id) = input.schedule_id {
            if let Some(schedule_id) = schedule_id {
                self.require_schedule(schedule_id).await?;
            }
            updated.schedule_id = schedule_id;
        }
        if let Some(role) = input.role {
            updated.role = role;
        }
        if let Some(vacation_days) = input.vacation_days {
            updated.vacation_days = vacation_days;
        }

        let renamed = updated.name != current.name;
        if updated.active && (renamed || input.pin.is_some()) {
            match &input.pin {
                Some(pin) => self.ensure_unique_credential(&updated.name, pin, Some(id)).await?,
                None => {
                    // The stored hash cannot be compared against other hashes,
                    // so sharing a name needs the raw PIN.
                    let others = self.store.find_active_by_name(&updated.name).await?;
                    if others.iter().any(|e| e.id != id) {
                        return Err(ValidationError::PinRequired.into());
                    }
                }
            }
        }
        if let Some(pin) = &input.pin {
            updated.pin_hash = self.hasher.hash(pin)?;
        }

        self.store
            .update_employee(&updated)
            .await
            .map_err(|e| schedule_gone(e, updated.schedule_id))?;
        if renamed && updated.active {
            self.names.remove(&current.name);
            self.names.insert(&updated.name);
        }

        info!(employee_id = id, renamed, "Employee updated");
        Ok(updated)
    }

    /// Soft delete: the record and its ledger stay, the employee drops out
    /// of rosters and credential resolution. Refused while the employee is
    /// clocked in or on break, since nobody could close that session later.
    #[instrument(skip(self, actor), fields(actor = actor.employee_id))]
    pub async fn deactivate(&self, actor: &Actor, id: u64) -> AppResult<()> {
        actor.require_hr()?;

        let _guard = self.writes.lock().await;
        let mut employee = self
            .store
            .get_employee(id)
            .await?
            .ok_or(NotFoundError::Employee(id))?;
        if !employee.active {
            return Ok(());
        }

        employee.active = false;
        match self.store.update_employee(&employee).await {
            Ok(()) => {}
            Err(StoreError::SessionOpen(_)) => return Err(ConflictError::OpenSession.into()),
            Err(e) => return Err(e.into()),
        }
        self.names.remove(&employee.name);

        info!(employee_id = id, "Employee deactivated");
        Ok(())
    }

    /// Creates the first HR manager when the directory has none.
    pub async fn bootstrap_hr(&self, name: &str, pin: &str) -> AppResult<Option<Employee>> {
        let employees = self.store.list_employees().await?;
        if employees.iter().any(|e| e.active && e.role == Role::HrManager) {
            return Ok(None);
        }

        let system = Actor::new(0, Role::HrManager);
        let employee = self
            .create(
                &system,
                CreateEmployee {
                    name: name.to_string(),
                    pin: pin.to_string(),
                    avatar_url: None,
                    schedule_id: None,
                    role: Some(Role::HrManager),
                    vacation_days: None,
                },
            )
            .await?;
        Ok(Some(employee))
    }

    /// Loads every active name into the credential name filter.
    pub async fn warm_name_filter(&self) -> AppResult<usize> {
        let names = self.store.active_names().await?;
        Ok(self.names.warmup(names))
    }

    async fn require_schedule(&self, schedule_id: u64) -> AppResult<()> {
        match self.store.get_schedule(schedule_id).await? {
            Some(_) => Ok(()),
            None => Err(NotFoundError::ScheduleType(schedule_id).into()),
        }
    }

    async fn ensure_unique_credential(
        &self,
        name: &str,
        pin: &str,
        except: Option<u64>,
    ) -> AppResult<()> {
        let same_name = self.store.find_active_by_name(name).await?;
        let clash = same_name
            .iter()
            .filter(|e| Some(e.id) != except)
            .any(|e| self.hasher.verify(pin, &e.pin_hash));
        if clash {
            return Err(ConflictError::DuplicateCredential.into());
        }
        Ok(())
    }
}

/// A schedule deleted between the existence check and the write.
fn schedule_gone(e: StoreError, schedule_id: Option<u64>) -> AppError {
    match (e, schedule_id) {
        (StoreError::Dangling(Reference::ScheduleType), Some(id)) => {
            NotFoundError::ScheduleType(id).into()
        }
        (e, _) => e.into(),
    }
}
