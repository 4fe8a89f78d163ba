//! Shared terminal endpoints. No bearer token: each clock action carries
//! the employee's PIN and is resolved on the spot.

use actix_web::{HttpResponse, web};
use tracing::{info, instrument};

use crate::AppState;
use crate::error::AppResult;
use crate::model::{Actor, EventKind};
use crate::models::KioskClockRequest;

#[utoipa::path(
    get,
    path = "/kiosk/roster",
    responses((status = 200, description = "Active employees to pick from", body = [RosterEntry])),
    tag = "Kiosk"
)]
pub async fn roster(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.directory.roster().await?))
}

#[utoipa::path(
    get,
    path = "/kiosk/clients",
    responses((status = 200, description = "Clients to clock in for", body = [Client])),
    tag = "Kiosk"
)]
pub async fn clients(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.clients.list().await?))
}

/// Resolve the PIN of the picked employee and record one clock action
#[utoipa::path(
    post,
    path = "/kiosk/clock",
    request_body = KioskClockRequest,
    responses(
        (status = 200, description = "Event recorded", body = ClockEvent),
        (status = 401, description = "PIN does not belong to the picked employee"),
        (status = 409, description = "Invalid transition for the current status"),
        (status = 422, description = "Malformed PIN or missing client"),
        (status = 429, description = "Too many failed attempts")
    ),
    tag = "Kiosk"
)]
#[instrument(name = "kiosk_clock", skip(state, body), fields(employee_id = body.employee_id, action = %body.action))]
pub async fn clock(
    state: web::Data<AppState>,
    body: web::Json<KioskClockRequest>,
) -> AppResult<HttpResponse> {
    let employee = state
        .identity
        .resolve_selected(body.employee_id, &body.pin)
        .await?;
    let actor = Actor::new(employee.id, employee.role);

    let event = match body.action {
        EventKind::In => {
            state
                .attendance
                .clock_in(&actor, employee.id, body.client_id)
                .await?
        }
        EventKind::Out => {
            state
                .attendance
                .clock_out(&actor, employee.id, body.client_id)
                .await?
        }
        EventKind::Pause => state.attendance.pause(&actor, employee.id).await?,
        EventKind::Resume => state.attendance.resume(&actor, employee.id).await?,
    };

    info!(event_id = event.id, "Kiosk clock action recorded");
    Ok(HttpResponse::Ok().json(event))
}
