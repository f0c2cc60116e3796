use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::Date;
use uuid::Uuid;

use crate::models::User;

/// Token type used to distinguish Access and Refresh JWTs.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    #[serde(alias = "Access")]
    Access,
    #[serde(alias = "Refresh")]
    Refresh,
}

/// Standard JWT claims used in the app.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // user ID
    pub exp: usize,      // expiration time
    pub iat: usize,      // issued at
    pub iss: String,     // issuer
    pub aud: String,     // audience
    pub kind: TokenKind, // access or refresh
}

/// Claims for the short-lived OAuth `state` parameter. The nonce makes each
/// login attempt's token unique; nothing is stored server-side.
#[derive(Debug, Serialize, Deserialize)]
pub struct StateClaims {
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
    pub aud: String,
    pub nonce: String,
}

/// Holds JWT signing and verification keys with config data.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

/// Query string delivered by the provider on the OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: String,
    pub state: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response returned after a completed login or refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub provider: String,
    pub is_admin: bool,
    pub pay_rate: f64,
    pub dark_mode: bool,
    #[serde(with = "crate::models::iso_date::option")]
    pub pay_period_start: Option<Date>,
    #[serde(with = "crate::models::iso_date::option")]
    pub pay_period_end: Option<Date>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            provider: u.provider,
            is_admin: u.is_admin,
            pay_rate: u.pay_rate,
            dark_mode: u.dark_mode,
            pay_period_start: u.pay_period_start,
            pay_period_end: u.pay_period_end,
        }
    }
}
