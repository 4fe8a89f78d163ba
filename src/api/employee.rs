use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::debug;
use utoipa::ToSchema;

use super::Pagination;
use crate::AppState;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::Employee;
use crate::model::employee::{CreateEmployee, EmployeeFilter, UpdateEmployee};

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: usize,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Schedule type not found"),
        (status = 409, description = "Another active employee uses this name and PIN"),
        (status = 422, description = "Empty name or malformed PIN")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateEmployee>,
) -> AppResult<HttpResponse> {
    let employee = state
        .directory
        .create(&auth.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(employee))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    params(EmployeeFilter, Pagination),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "HR manager only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    state: web::Data<AppState>,
    filter: web::Query<EmployeeFilter>,
    paging: web::Query<Pagination>,
) -> AppResult<HttpResponse> {
    let employees = state.directory.list(&auth.actor(), &filter).await?;
    let (data, page, per_page, total) = paging.apply(employees);
    debug!(total, page, "Employee list served");

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee", body = Employee),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let employee = state.directory.get(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Partial update. `null` clears avatar or schedule.
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Updated employee", body = Employee),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Employee or schedule type not found"),
        (status = 409, description = "Another active employee uses this name and PIN"),
        (status = 422, description = "Validation failed")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> AppResult<HttpResponse> {
    let employee = state
        .directory
        .update(&auth.actor(), path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Soft delete; the employee's ledger is kept.
#[utoipa::path(
    delete,
    path = "/api/employees/{id}",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 204, description = "Employee deactivated"),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee is still clocked in", body = Object, example = json!({
            "error": "conflict.open_session",
            "message": "employee is still clocked in, clock them out first"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    state
        .directory
        .deactivate(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    get,
    path = "/api/employees/{id}/vacation-balance",
    params(("id" = u64, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Vacation allowance and usage", body = VacationBalance),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn vacation_balance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let balance = state
        .requests
        .vacation_balance(&auth.actor(), path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(balance))
}
