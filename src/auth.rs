//! Bearer token verification.
//!
//! Tokens are minted by the external auth service (login + bcrypt live there);
//! this crate only checks the HS256 signature and expiry and turns the claims
//! into an [`AuthUser`].

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: Role,
    pub exp: u64,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owners and administrators may modify a location.
    pub fn can_modify(&self, created_by: i64) -> bool {
        self.is_admin() || self.id == created_by
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self { id: claims.sub, username: claims.username, role: claims.role }
    }
}

pub fn issue_token(cfg: &AuthConfig, user_id: i64, username: &str, role: Role) -> AppResult<String> {
    let exp = chrono::Utc::now().timestamp().max(0) as u64 + cfg.token_ttl_secs;
    let claims = Claims { sub: user_id, username: username.to_string(), role, exp };
    Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(cfg.jwt_secret.as_bytes()))?)
}

pub fn verify_token(cfg: &AuthConfig, token: &str) -> AppResult<AuthUser> {
    let data = decode::<Claims>(token, &DecodingKey::from_secret(cfg.jwt_secret.as_bytes()), &Validation::default())?;
    Ok(data.claims.into())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        verify_token(&state.config.auth, token)
    }
}
