use actix_web::{HttpRequest, HttpResponse, get, web};
use tracing::{debug, info, instrument};

use crate::AppState;
use crate::auth::auth::{AuthUser, bearer_token};
use crate::error::{AppResult, AuthError};
use crate::model::{Actor, Role};
use crate::models::LoginRequest;

/// Personal login with name and PIN
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair issued", body = TokenPair),
        (status = 401, description = "Invalid credentials", body = Object, example = json!({
            "error": "auth.not_found",
            "message": "no active employee matches the presented name and PIN"
        })),
        (status = 422, description = "Malformed name or PIN"),
        (status = 429, description = "Too many failed attempts")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(state, body), fields(name = %body.name.trim()))]
pub async fn login(
    body: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    let employee = state.identity.resolve(&body.name, &body.pin).await?;
    debug!(employee_id = employee.id, "Credential verified, issuing tokens");

    let tokens = state.tokens.issue(&employee).await?;
    info!(employee_id = employee.id, role = %employee.role, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(req: HttpRequest, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let token = bearer_token(&req).ok_or(AuthError::MissingToken)?;
    let claims = state.tokens.verify_refresh(token).await?;

    // Deactivated employees lose their sessions at the next refresh.
    let owner = Actor::new(claims.sub, Role::Employee);
    let employee = match state.directory.get(&owner, claims.sub).await {
        Ok(e) if e.active => e,
        _ => return Err(AuthError::InvalidToken("employee is no longer active".into()).into()),
    };

    let tokens = state.tokens.issue(&employee).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revoke a refresh token. Always succeeds.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(token) = bearer_token(&req) {
        state.tokens.revoke(token).await;
    }
    HttpResponse::NoContent().finish()
}

/// Who am I
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "The authenticated employee", body = Employee),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
#[get("/me")]
pub async fn me(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let employee = state.directory.get(&auth.actor(), auth.employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}
