pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod model;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use store::{MemoryStore, MySqlStore, Store};

use auth::jwt::TokenService;
use auth::password::PinHasher;
use services::{
    AttendanceService, ClientService, DirectoryService, IdentityService, ReportingService,
    RequestService, ScheduleService,
};
use utils::NameFilter;

/// Every service the HTTP layer talks to, wired over one store and clock.
pub struct AppState {
    pub identity: IdentityService,
    pub directory: DirectoryService,
    pub attendance: AttendanceService,
    pub schedules: ScheduleService,
    pub clients: ClientService,
    pub reporting: ReportingService,
    pub requests: RequestService,
    pub tokens: TokenService,
}

impl AppState {
    pub fn build(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: &Config) -> AppResult<Self> {
        let hasher = PinHasher::new(config.pin_hash_memory_kib, config.pin_hash_iterations)?;
        let names = Arc::new(NameFilter::new());
        let offset = config
            .utc_offset()
            .ok_or_else(|| AppError::Internal("UTC offset out of range".into()))?;

        Ok(Self {
            identity: IdentityService::new(
                store.clone(),
                hasher.clone(),
                names.clone(),
                config.pin_max_attempts,
                Duration::from_secs(config.pin_lockout_secs),
            ),
            directory: DirectoryService::new(store.clone(), clock.clone(), hasher, names),
            attendance: AttendanceService::new(store.clone(), clock.clone()),
            schedules: ScheduleService::new(store.clone()),
            clients: ClientService::new(store.clone()),
            reporting: ReportingService::new(
                store.clone(),
                clock.clone(),
                Duration::from_secs(config.report_timeout_secs),
                offset,
            ),
            requests: RequestService::new(store, clock),
            tokens: TokenService::new(
                config.jwt_secret.clone(),
                config.access_token_ttl,
                config.refresh_token_ttl,
            ),
        })
    }
}
