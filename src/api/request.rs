use actix_web::{HttpResponse, web};
use serde::Serialize;
use serde_json::json;
use utoipa::ToSchema;

use super::Pagination;
use crate::AppState;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::Request;
use crate::model::request::{CreateRequest, Decision, RequestFilter};

#[derive(Serialize, ToSchema)]
pub struct RequestListResponse {
    pub data: Vec<Request>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 3)]
    pub total: usize,
}

/// Raise a request for the caller
#[utoipa::path(
    post,
    path = "/api/requests",
    request_body = CreateRequest,
    responses(
        (status = 201, description = "Request created", body = Request),
        (status = 422, description = "Start date after end date")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn create_request(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateRequest>,
) -> AppResult<HttpResponse> {
    let request = state
        .requests
        .create(&auth.actor(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(request))
}

/// HR sees all requests, employees their own
#[utoipa::path(
    get,
    path = "/api/requests",
    params(RequestFilter, Pagination),
    responses((status = 200, description = "Requests, newest first", body = RequestListResponse)),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn list_requests(
    auth: AuthUser,
    state: web::Data<AppState>,
    filter: web::Query<RequestFilter>,
    paging: web::Query<Pagination>,
) -> AppResult<HttpResponse> {
    let requests = state.requests.list(&auth.actor(), &filter).await?;
    let (data, page, per_page, total) = paging.apply(requests);
    Ok(HttpResponse::Ok().json(RequestListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/requests/{id}",
    params(("id" = u64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Request", body = Request),
        (status = 403, description = "Not your request"),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn get_request(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    let request = state.requests.get(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

async fn decide(
    auth: AuthUser,
    state: web::Data<AppState>,
    id: u64,
    decision: Decision,
) -> AppResult<HttpResponse> {
    let request = state.requests.decide(&auth.actor(), id, decision).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/approve",
    params(("id" = u64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Approved", body = Request),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn approve_request(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    decide(auth, state, path.into_inner(), Decision::Approve).await
}

#[utoipa::path(
    put,
    path = "/api/requests/{id}/reject",
    params(("id" = u64, Path, description = "Request id")),
    responses(
        (status = 200, description = "Rejected", body = Request),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn reject_request(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    decide(auth, state, path.into_inner(), Decision::Reject).await
}

#[utoipa::path(
    get,
    path = "/api/requests/pending-count",
    responses(
        (status = 200, description = "Number of pending requests", body = Object, example = json!({ "pending": 2 })),
        (status = 403, description = "HR manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Request"
)]
pub async fn pending_count(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let pending = state.requests.pending_count(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(json!({ "pending": pending })))
}
