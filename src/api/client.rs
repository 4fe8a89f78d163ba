use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::client::ClientInput;

#[utoipa::path(
    get,
    path = "/api/clients",
    responses((status = 200, description = "All clients", body = [Client])),
    security(("bearer_auth" = [])),
    tag = "Client"
)]
pub async fn list_clients(_auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.clients.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/clients/{id}",
    params(("id" = u64, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = Client),
        (status = 404, description = "Not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Client"
)]
pub async fn get_client(
    _auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(state.clients.get(path.into_inner()).await?))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    request_body = ClientInput,
    responses(
        (status = 201, description = "Created", body = Client),
        (status = 403, description = "HR manager only"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Client"
)]
pub async fn create_client(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<ClientInput>,
) -> AppResult<HttpResponse> {
    let client = state.clients.create(&auth.actor(), &payload.name).await?;
    Ok(HttpResponse::Created().json(client))
}

#[utoipa::path(
    put,
    path = "/api/clients/{id}",
    params(("id" = u64, Path, description = "Client id")),
    request_body = ClientInput,
    responses(
        (status = 200, description = "Renamed", body = Client),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Name already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Client"
)]
pub async fn update_client(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<ClientInput>,
) -> AppResult<HttpResponse> {
    let client = state
        .clients
        .rename(&auth.actor(), path.into_inner(), &payload.name)
        .await?;
    Ok(HttpResponse::Ok().json(client))
}

#[utoipa::path(
    delete,
    path = "/api/clients/{id}",
    params(("id" = u64, Path, description = "Client id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "HR manager only"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Referenced by clock events")
    ),
    security(("bearer_auth" = [])),
    tag = "Client"
)]
pub async fn delete_client(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<HttpResponse> {
    state.clients.delete(&auth.actor(), path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
