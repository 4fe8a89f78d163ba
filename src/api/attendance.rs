use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::AppState;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::models::ClockRequest;

#[derive(Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Range start (RFC 3339)
    #[param(value_type = String, format = "date-time")]
    pub from: DateTime<Utc>,
    /// Range end (RFC 3339)
    #[param(value_type = String, format = "date-time")]
    pub to: DateTime<Utc>,
}

fn target(auth: &AuthUser, body: &ClockRequest) -> u64 {
    body.employee_id.unwrap_or(auth.employee_id)
}

/// Clock in for a client
#[utoipa::path(
    post,
    path = "/api/attendance/clock-in",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Clocked in", body = ClockEvent),
        (status = 404, description = "Unknown client or employee"),
        (status = 409, description = "Already clocked in", body = Object, example = json!({
            "error": "state.invalid_transition",
            "message": "cannot record 'in' while clocked_in"
        })),
        (status = 422, description = "No client selected")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_in(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ClockRequest>,
) -> AppResult<HttpResponse> {
    let event = state
        .attendance
        .clock_in(&auth.actor(), target(&auth, &body), body.client_id)
        .await?;
    Ok(HttpResponse::Ok().json(event))
}

/// Clock out of the open session
#[utoipa::path(
    post,
    path = "/api/attendance/clock-out",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Clocked out", body = ClockEvent),
        (status = 409, description = "Not clocked in"),
        (status = 422, description = "Client does not match the open session")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn clock_out(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ClockRequest>,
) -> AppResult<HttpResponse> {
    let event = state
        .attendance
        .clock_out(&auth.actor(), target(&auth, &body), body.client_id)
        .await?;
    Ok(HttpResponse::Ok().json(event))
}

/// Start a break
#[utoipa::path(
    post,
    path = "/api/attendance/pause",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "On break", body = ClockEvent),
        (status = 409, description = "Not clocked in")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn pause(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ClockRequest>,
) -> AppResult<HttpResponse> {
    let event = state
        .attendance
        .pause(&auth.actor(), target(&auth, &body))
        .await?;
    Ok(HttpResponse::Ok().json(event))
}

/// End a break
#[utoipa::path(
    post,
    path = "/api/attendance/resume",
    request_body = ClockRequest,
    responses(
        (status = 200, description = "Back to work", body = ClockEvent),
        (status = 409, description = "Not on break")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn resume(
    auth: AuthUser,
    state: web::Data<AppState>,
    body: web::Json<ClockRequest>,
) -> AppResult<HttpResponse> {
    let event = state
        .attendance
        .resume(&auth.actor(), target(&auth, &body))
        .await?;
    Ok(HttpResponse::Ok().json(event))
}

/// Current status of the caller
#[utoipa::path(
    get,
    path = "/api/attendance/status",
    responses((status = 200, description = "Attendance status", body = StatusView)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_status(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let status = state
        .attendance
        .status(&auth.actor(), auth.employee_id)
        .await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Current status of an employee
#[utoipa::path(
    get,
    path = "/api/attendance/status/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Attendance status", body = StatusView),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Employee not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn status(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let status = state
        .attendance
        .status(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Clock events of an employee in a range
#[utoipa::path(
    get,
    path = "/api/attendance/history/{employee_id}",
    params(("employee_id" = u64, Path, description = "Employee id"), HistoryQuery),
    responses(
        (status = 200, description = "Events, oldest first", body = [ClockEvent]),
        (status = 403, description = "Not your record"),
        (status = 422, description = "Range start is not before its end")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn history(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<HistoryQuery>,
) -> AppResult<HttpResponse> {
    let events = state
        .attendance
        .history(&auth.actor(), path.into_inner(), query.from, query.to)
        .await?;
    Ok(HttpResponse::Ok().json(events))
}
