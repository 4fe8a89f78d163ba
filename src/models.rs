use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::EventKind;

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "Juanjo")]
    pub name: String,
    #[schema(example = "6119")]
    pub pin: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// One kiosk interaction: pick yourself, type your PIN, choose an action.
#[derive(Deserialize, ToSchema)]
pub struct KioskClockRequest {
    #[schema(example = 4)]
    pub employee_id: u64,
    #[schema(example = "6119")]
    pub pin: String,
    #[schema(example = "in")]
    pub action: EventKind,
    /// Required for `in`; optional for `out`, where it must match the session.
    pub client_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct ClockRequest {
    /// Act for another employee (HR only). Defaults to the caller.
    pub employee_id: Option<u64>,
    pub client_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Employee id
    pub sub: u64,
    pub name: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}
