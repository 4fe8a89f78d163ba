use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

use crate::model::{AttendanceStatus, EventKind};
use crate::store::StoreError;

/// Credential and token failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no active employee matches the presented name and PIN")]
    NotFound,

    /// Two or more active employees share the credential. This is a
    /// directory integrity fault, not a user typo.
    #[error("credential for '{name}' matches {matches} employees")]
    Ambiguous { name: String, matches: usize },

    #[error("too many failed PIN attempts, try again later")]
    TooManyAttempts,

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("cannot record '{attempted}' while {from}")]
    InvalidTransition {
        from: AttendanceStatus,
        attempted: EventKind,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("another active employee already uses this name and PIN")]
    DuplicateCredential,

    #[error("schedule type is assigned to {employees} employee(s)")]
    ScheduleInUse { employees: usize },

    #[error("a client named '{0}' already exists")]
    DuplicateClient(String),

    #[error("client is referenced by recorded clock events")]
    ClientInUse,

    #[error("request was already {0}")]
    RequestAlreadyDecided(String),

    #[error("attendance changed concurrently, retry")]
    ConcurrentModification,

    #[error("employee is still clocked in, clock them out first")]
    OpenSession,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("PIN must be exactly 4 digits")]
    BadPinFormat,

    #[error("name must not be empty")]
    EmptyName,

    #[error("a client must be selected to clock in")]
    MissingClient,

    #[error("session is open for client {open}, not {given}")]
    ClientMismatch { open: u64, given: u64 },

    #[error("weekly hours must be greater than 0 and at most 168")]
    InvalidWeeklyHours,

    #[error("report range start must be before its end")]
    InvalidRange,

    #[error("{0}")]
    InvalidDates(String),

    #[error("unknown schedule day '{0}'")]
    UnknownWeekday(String),

    #[error("a PIN must be supplied when taking a name another employee already uses")]
    PinRequired,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    #[error("employee {0} not found")]
    Employee(u64),

    #[error("schedule type {0} not found")]
    ScheduleType(u64),

    #[error("client {0} not found")]
    Client(u64),

    #[error("request {0} not found")]
    Request(u64),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("report generation was cancelled")]
    Cancelled,

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Stable machine-readable code so clients can tell error kinds apart.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(e) => match e {
                AuthError::NotFound => "auth.not_found",
                AuthError::Ambiguous { .. } => "auth.ambiguous",
                AuthError::TooManyAttempts => "auth.too_many_attempts",
                AuthError::MissingToken => "auth.missing_token",
                AuthError::InvalidToken(_) => "auth.invalid_token",
            },
            AppError::State(StateError::InvalidTransition { .. }) => "state.invalid_transition",
            AppError::Conflict(e) => match e {
                ConflictError::DuplicateCredential => "conflict.duplicate_credential",
                ConflictError::ScheduleInUse { .. } => "conflict.schedule_in_use",
                ConflictError::DuplicateClient(_) => "conflict.duplicate_client",
                ConflictError::ClientInUse => "conflict.client_in_use",
                ConflictError::RequestAlreadyDecided(_) => "conflict.request_already_decided",
                ConflictError::ConcurrentModification => "conflict.concurrent_modification",
                ConflictError::OpenSession => "conflict.open_session",
            },
            AppError::Validation(e) => match e {
                ValidationError::BadPinFormat => "validation.bad_pin_format",
                ValidationError::EmptyName => "validation.empty_name",
                ValidationError::MissingClient => "validation.missing_client",
                ValidationError::ClientMismatch { .. } => "validation.client_mismatch",
                ValidationError::InvalidWeeklyHours => "validation.invalid_weekly_hours",
                ValidationError::InvalidRange => "validation.invalid_range",
                ValidationError::InvalidDates(_) => "validation.invalid_dates",
                ValidationError::UnknownWeekday(_) => "validation.unknown_weekday",
                ValidationError::PinRequired => "validation.pin_required",
            },
            AppError::NotFound(e) => match e {
                NotFoundError::Employee(_) => "not_found.employee",
                NotFoundError::ScheduleType(_) => "not_found.schedule_type",
                NotFoundError::Client(_) => "not_found.client",
                NotFoundError::Request(_) => "not_found.request",
            },
            AppError::Forbidden(_) => "forbidden",
            AppError::Cancelled => "cancelled",
            AppError::Storage(_) => "storage",
            AppError::Internal(_) => "internal",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::Ambiguous { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(AuthError::TooManyAttempts) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::State(_) => StatusCode::CONFLICT,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Storage details stay in the log.
        let message = match self {
            AppError::Storage(e) => {
                tracing::error!(error = %e, "Storage failure");
                "Internal Server Error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!(error = %e, "Internal failure");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(status).json(json!({
            "error": self.code(),
            "message": message,
        }))
    }
}
