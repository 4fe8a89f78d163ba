use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::schedule_type::ScheduleInput;

#[utoipa::path(
    get,
    path = "/api/schedule-types",
    responses((status = 200, description = "All schedule types", body = [ScheduleType])),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn list_schedules(_auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.schedules.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/schedule-types/{id}",
    params(("id" = u64, Path, description = "Schedule type id")),
    responses(
        (status = 200, description = "Schedule type", body = ScheduleType),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn get_schedule(
    _auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.schedules.get(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/schedule-types",
    request_body = ScheduleInput,
    responses(
        (status = 201, description = "Created", body = ScheduleType),
        (status = 403, description = "HR manager only"),
        (status = 422, description = "Weekly hours out of range or unknown weekday")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn create_schedule(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<ScheduleInput>,
) -> AppResult<HttpResponse> {
    let schedule = state
        .schedules
        .create(&auth.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(schedule))
}

#[utoipa::path(
    put,
    path = "/api/schedule-types/{id}",
    params(("id" = u64, Path, description = "Schedule type id")),
    request_body = ScheduleInput,
    responses(
        (status = 200, description = "Updated", body = ScheduleType),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Not found"),
        (status = 422, description = "Validation failed")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn update_schedule(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<ScheduleInput>,
) -> AppResult<HttpResponse> {
    let schedule = state
        .schedules
        .update(&auth.actor(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(schedule))
}

#[utoipa::path(
    delete,
    path = "/api/schedule-types/{id}",
    params(("id" = u64, Path, description = "Schedule type id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Still assigned to employees", body = Object, example = json!({
            "error": "conflict.schedule_in_use",
            "message": "schedule type is assigned to 3 employee(s)"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn delete_schedule(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    state
        .schedules
        .delete(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/schedule-types/{id}/employees",
    params(("id" = u64, Path, description = "Schedule type id")),
    responses(
        (status = 200, description = "Employees on the schedule, active or not", body = [Employee]),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Schedule"
)]
pub async fn schedule_employees(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employees = state
        .schedules
        .employees_on_schedule(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employees))
}
