#![allow(dead_code, unused_macros)]

pub mod racing;

use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::http::header;
use actix_web::web;
use chrono::{DateTime, TimeZone, Utc};

use fichaje::model::employee::CreateEmployee;
use fichaje::model::{Actor, Client, Employee, Role};
use fichaje::{AppState, Config, ManualClock, MemoryStore};

/// Builds the full HTTP service over a `TestApp`'s state.
macro_rules! init_app {
    ($app:expr) => {{
        let config = $app.config.clone();
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data($app.state.clone())
                .app_data(actix_web::web::Data::new(config.clone()))
                .configure(move |cfg| fichaje::routes::configure(cfg, config)),
        )
        .await
    }};
}

pub const HR_NAME: &str = "Marta";
pub const HR_PIN: &str = "1234";

/// 2026-03-02 08:00 UTC, a Monday.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

// Test application wrapper
pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub config: Config,
    pub state: web::Data<AppState>,
    pub hr: Employee,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::for_tests()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let state = AppState::build(store.clone(), clock.clone(), &config)
            .expect("test state should build");
        let hr = state
            .directory
            .bootstrap_hr(HR_NAME, HR_PIN)
            .await
            .expect("bootstrap should succeed")
            .expect("directory starts empty");

        Self {
            store,
            clock,
            config,
            state: web::Data::new(state),
            hr,
        }
    }

    pub fn hr_actor(&self) -> Actor {
        Actor::new(self.hr.id, Role::HrManager)
    }

    pub async fn employee(&self, name: &str, pin: &str) -> Employee {
        self.state
            .directory
            .create(
                &self.hr_actor(),
                CreateEmployee {
                    name: name.to_string(),
                    pin: pin.to_string(),
                    avatar_url: None,
                    schedule_id: None,
                    role: None,
                    vacation_days: None,
                },
            )
            .await
            .expect("employee should be created")
    }

    pub async fn client(&self, name: &str) -> Client {
        self.state
            .clients
            .create(&self.hr_actor(), name)
            .await
            .expect("client should be created")
    }
}

pub fn actor_of(employee: &Employee) -> Actor {
    Actor::new(employee.id, employee.role)
}

/// Governor keys on the peer address, so every test request needs one.
pub fn peer() -> SocketAddr {
    "127.0.0.1:40000".parse().unwrap()
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}
