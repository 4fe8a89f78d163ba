use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

use crate::auth::jwt::{actor_from_claims, verify_token};
use crate::config::Config;
use crate::error::{AppError, AuthError};
use crate::model::{Actor, Role};

/// The authenticated caller of a protected route.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub employee_id: u64,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.employee_id, self.role)
    }
}

impl From<Actor> for AuthUser {
    fn from(actor: Actor) -> Self {
        Self {
            employee_id: actor.employee_id,
            role: actor.role,
        }
    }
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by the auth middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(*user));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => return ready(Err(AuthError::MissingToken.into())),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(AppError::Internal("Config missing".into()))),
        };

        let actor = verify_token(token, &config.jwt_secret).and_then(|claims| actor_from_claims(&claims));
        ready(actor.map(AuthUser::from).map_err(AppError::from))
    }
}
