use crate::api::Pagination;
use crate::api::employee::EmployeeListResponse;
use crate::api::request::RequestListResponse;
use crate::model::client::ClientInput;
use crate::model::employee::{CreateEmployee, RosterEntry, UpdateEmployee};
use crate::model::report::{
    Anomaly, ClientHours, Dashboard, EmployeeHours, EmployeeShare, FleetStats, ReportScope,
    Summary,
};
use crate::model::request::{CreateRequest, VacationBalance};
use crate::model::schedule_type::ScheduleInput;
use crate::model::{
    ActivityEntry, AttendanceStatus, Client, ClockEvent, Employee, EventKind, Request, RequestKind,
    RequestStatus, Role, ScheduleKind, ScheduleType, StatusView,
};
use crate::models::{ClockRequest, KioskClockRequest, LoginRequest, TokenPair};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fichaje API",
        version = "0.1.0",
        description = r#"
## Employee time and attendance

Employees identify with their **name and a 4-digit PIN**, either through a
personal session or at a shared **kiosk**, and record a strictly ordered
sequence of clock events: `in` (for a client), `pause`, `resume`, `out`.

### Key Features
- **Attendance**: clock in/out with pauses, current status, per-employee history
- **Directory**: employees, roles, PIN credentials, soft deactivation
- **Schedule types**: weekly hour targets with optional per-weekday slots
- **Clients**: the parties time is booked against
- **Reports**: hours per employee and per client over any range, HR dashboard
- **Requests**: vacation and absence requests with an HR approval workflow

### Security
Endpoints under `/api` expect a **JWT Bearer** access token from `/auth/login`.
Kiosk endpoints take the PIN with every clock action instead.

### Errors
Every error is `{"error": "<family>.<kind>", "message": "..."}`.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,

        crate::api::kiosk::roster,
        crate::api::kiosk::clients,
        crate::api::kiosk::clock,

        crate::api::attendance::clock_in,
        crate::api::attendance::clock_out,
        crate::api::attendance::pause,
        crate::api::attendance::resume,
        crate::api::attendance::my_status,
        crate::api::attendance::status,
        crate::api::attendance::history,

        crate::api::employee::create_employee,
        crate::api::employee::get_employee,
        crate::api::employee::list_employees,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,
        crate::api::employee::vacation_balance,

        crate::api::schedule::list_schedules,
        crate::api::schedule::get_schedule,
        crate::api::schedule::create_schedule,
        crate::api::schedule::update_schedule,
        crate::api::schedule::delete_schedule,
        crate::api::schedule::schedule_employees,

        crate::api::client::list_clients,
        crate::api::client::get_client,
        crate::api::client::create_client,
        crate::api::client::update_client,
        crate::api::client::delete_client,

        crate::api::report::summary,
        crate::api::report::dashboard,

        crate::api::request::create_request,
        crate::api::request::list_requests,
        crate::api::request::get_request,
        crate::api::request::approve_request,
        crate::api::request::reject_request,
        crate::api::request::pending_count
    ),
    components(
        schemas(
            LoginRequest,
            TokenPair,
            KioskClockRequest,
            ClockRequest,
            Pagination,
            Role,
            Employee,
            CreateEmployee,
            UpdateEmployee,
            RosterEntry,
            EmployeeListResponse,
            EventKind,
            ClockEvent,
            ActivityEntry,
            AttendanceStatus,
            StatusView,
            ScheduleKind,
            ScheduleType,
            ScheduleInput,
            Client,
            ClientInput,
            ReportScope,
            EmployeeHours,
            EmployeeShare,
            ClientHours,
            Anomaly,
            FleetStats,
            Summary,
            Dashboard,
            RequestKind,
            RequestStatus,
            Request,
            CreateRequest,
            RequestListResponse,
            VacationBalance
        )
    ),
    tags(
        (name = "Auth", description = "Personal sessions"),
        (name = "Kiosk", description = "Shared clocking terminal"),
        (name = "Attendance", description = "Clock events and status"),
        (name = "Employee", description = "Employee directory"),
        (name = "Schedule", description = "Schedule types"),
        (name = "Client", description = "Client registry"),
        (name = "Report", description = "Hours reporting and dashboard"),
        (name = "Request", description = "Vacation and absence requests"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
