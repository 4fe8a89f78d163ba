use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

use crate::auth::auth::AuthUser;
use crate::auth::jwt::{actor_from_claims, verify_token};
use crate::config::Config;
use crate::error::{AppError, AuthError};

/// Rejects requests without a valid access token and stores the caller for
/// the `AuthUser` extractor.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let actor = match token {
        Some(token) => verify_token(token, &config.jwt_secret).and_then(|c| actor_from_claims(&c)),
        None => Err(AuthError::MissingToken),
    };

    match actor {
        Ok(actor) => {
            req.extensions_mut().insert(AuthUser::from(actor));
            next.call(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = req.path(), "Rejected unauthenticated request");
            let resp = AppError::from(e).error_response();
            Ok(req.into_response(resp))
        }
    }
}
