use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::future::Cache;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult, AuthError};
use crate::model::{Actor, Employee, Role};
use crate::models::{Claims, TokenPair, TokenType};

fn now() -> usize {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .unwrap_or_default()
}

fn claims_for(employee_id: u64, name: &str, role: Role, ttl: usize, token_type: TokenType) -> Claims {
    Claims {
        sub: employee_id,
        name: name.to_string(),
        role: role.id(),
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
    }
}

fn sign(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("jwt encode: {e}")))
}

pub fn generate_access_token(employee: &Employee, secret: &str, ttl: usize) -> AppResult<String> {
    let claims = claims_for(employee.id, &employee.name, employee.role, ttl, TokenType::Access);
    sign(&claims, secret)
}

pub fn generate_refresh_token(employee: &Employee, secret: &str, ttl: usize) -> AppResult<(String, Claims)> {
    let claims = claims_for(employee.id, &employee.name, employee.role, ttl, TokenType::Refresh);
    let token = sign(&claims, secret)?;
    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

/// Access-token claims to the acting identity.
pub fn actor_from_claims(claims: &Claims) -> Result<Actor, AuthError> {
    if claims.token_type != TokenType::Access {
        return Err(AuthError::InvalidToken("not an access token".into()));
    }
    let role = Role::from_id(claims.role).ok_or_else(|| AuthError::InvalidToken("invalid role".into()))?;
    Ok(Actor::new(claims.sub, role))
}

/// Issues token pairs and tracks which refresh tokens are still live.
/// Refresh tokens rotate: each one can be exchanged once.
pub struct TokenService {
    secret: String,
    access_ttl: usize,
    refresh_ttl: usize,
    /// Live refresh-token ids mapped to their employee.
    live_refresh: Cache<String, u64>,
}

impl TokenService {
    pub fn new(secret: String, access_ttl: usize, refresh_ttl: usize) -> Self {
        Self {
            secret,
            access_ttl,
            refresh_ttl,
            live_refresh: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(Duration::from_secs(refresh_ttl as u64))
                .build(),
        }
    }

    pub async fn issue(&self, employee: &Employee) -> AppResult<TokenPair> {
        let access_token = generate_access_token(employee, &self.secret, self.access_ttl)?;
        let (refresh_token, refresh_claims) =
            generate_refresh_token(employee, &self.secret, self.refresh_ttl)?;

        debug!(employee_id = employee.id, jti = %refresh_claims.jti, "Storing refresh token");
        self.live_refresh
            .insert(refresh_claims.jti, employee.id)
            .await;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Consumes a live refresh token and returns its claims.
    pub async fn verify_refresh(&self, token: &str) -> AppResult<Claims> {
        let claims = verify_token(token, &self.secret)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken("not a refresh token".into()).into());
        }
        if self.live_refresh.remove(&claims.jti).await.is_none() {
            info!(employee_id = claims.sub, "Refresh token reused or revoked");
            return Err(AuthError::InvalidToken("refresh token revoked".into()).into());
        }
        Ok(claims)
    }

    /// Idempotent.
    pub async fn revoke(&self, token: &str) {
        if let Ok(claims) = verify_token(token, &self.secret) {
            if claims.token_type == TokenType::Refresh {
                self.live_refresh.invalidate(&claims.jti).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn employee(role: Role) -> Employee {
        Employee {
            id: 4,
            name: "Juanjo".into(),
            pin_hash: String::new(),
            avatar_url: None,
            schedule_id: None,
            role,
            vacation_days: 22,
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_carries_actor() {
        let token = generate_access_token(&employee(Role::HrManager), "k", 60).unwrap();
        let claims = verify_token(&token, "k").unwrap();
        assert_eq!(actor_from_claims(&claims).unwrap(), Actor::new(4, Role::HrManager));
        assert!(verify_token(&token, "other").is_err());
    }

    #[tokio::test]
    async fn refresh_tokens_rotate_once() {
        let tokens = TokenService::new("k".into(), 60, 600);
        let pair = tokens.issue(&employee(Role::Employee)).await.unwrap();

        let claims = tokens.verify_refresh(&pair.refresh_token).await.unwrap();
        assert_eq!(claims.sub, 4);
        assert!(tokens.verify_refresh(&pair.refresh_token).await.is_err());
        assert!(tokens.verify_refresh(&pair.access_token).await.is_err());
    }

    #[tokio::test]
    async fn revoked_refresh_token_is_rejected() {
        let tokens = TokenService::new("k".into(), 60, 600);
        let pair = tokens.issue(&employee(Role::Employee)).await.unwrap();
        tokens.revoke(&pair.refresh_token).await;
        assert!(tokens.verify_refresh(&pair.refresh_token).await.is_err());
    }
}
