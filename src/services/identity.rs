use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument, warn};

use crate::auth::password::{PinHasher, validate_pin};
use crate::error::{AppResult, AuthError, ValidationError};
use crate::model::Employee;
use crate::store::Store;
use crate::utils::{AttemptCache, NameFilter};

/// Resolves a presented (name, PIN) credential to exactly one active employee.
pub struct IdentityService {
    store: Arc<dyn Store>,
    hasher: PinHasher,
    names: Arc<NameFilter>,
    attempts: AttemptCache,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn Store>,
        hasher: PinHasher,
        names: Arc<NameFilter>,
        max_attempts: u32,
        lockout: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            names,
            attempts: AttemptCache::new(max_attempts, lockout),
        }
    }

    /// Names match exactly (case-sensitive) after trimming surrounding
    /// whitespace. Only active employees resolve.
    #[instrument(name = "resolve_identity", skip(self, pin), fields(name = %name.trim()))]
    pub async fn resolve(&self, name: &str, pin: &str) -> AppResult<Employee> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        validate_pin(pin)?;

        if self.attempts.is_locked(name).await {
            warn!("Credential locked after repeated failures");
            return Err(AuthError::TooManyAttempts.into());
        }

        if !self.names.might_exist(name) {
            debug!("Name filter miss");
            self.attempts.record_failure(name).await;
            return Err(AuthError::NotFound.into());
        }

        let candidates = self.store.find_active_by_name(name).await?;
        let mut matches: Vec<Employee> = candidates
            .into_iter()
            .filter(|e| self.hasher.verify(pin, &e.pin_hash))
            .collect();

        match matches.len() {
            0 => {
                let failures = self.attempts.record_failure(name).await;
                info!(failures, "Invalid credentials");
                Err(AuthError::NotFound.into())
            }
            1 => {
                self.attempts.clear(name).await;
                let employee = matches.remove(0);
                debug!(employee_id = employee.id, "Credential resolved");
                Ok(employee)
            }
            n => {
                let ids: Vec<u64> = matches.iter().map(|e| e.id).collect();
                error!(matches = n, ?ids, "Directory integrity fault: shared credential");
                Err(AuthError::Ambiguous {
                    name: name.to_string(),
                    matches: n,
                }
                .into())
            }
        }
    }

    /// Kiosk flow: the user picks themselves from the roster, then types a
    /// PIN. The credential must resolve to the picked employee.
    pub async fn resolve_selected(&self, employee_id: u64, pin: &str) -> AppResult<Employee> {
        let selected = match self.store.get_employee(employee_id).await? {
            Some(e) if e.active => e,
            _ => return Err(AuthError::NotFound.into()),
        };

        let resolved = self.resolve(&selected.name, pin).await?;
        if resolved.id != selected.id {
            info!(
                selected = selected.id,
                resolved = resolved.id,
                "PIN belongs to a different employee with the same name"
            );
            return Err(AuthError::NotFound.into());
        }
        Ok(resolved)
    }
}
