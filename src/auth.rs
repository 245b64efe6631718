use axum::http::{header, HeaderMap};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::shared::AppError;

/// Claims carried by administrative tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String,
    pub admin: bool,
    pub exp: usize,
    pub iat: usize,
}

/// Configuration for JWT token operations
#[derive(Clone)]
pub struct TokenConfig {
    secret: String,
    pub expiration_days: i64,
}

impl TokenConfig {
    pub fn new() -> Self {
        let expiration_days = std::env::var("ADMIN_TOKEN_EXPIRATION_DAYS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        Self {
            secret: std::env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key-change-in-production".to_string()),
            expiration_days,
        }
    }

    /// Creates a signed admin token for the given subject.
    #[instrument(skip(self, subject))]
    pub fn create_admin_token(&self, subject: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = AdminClaims {
            sub: subject.to_string(),
            admin: true,
            exp: (now + Duration::days(self.expiration_days)).timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
        .map_err(|e| {
            debug!(error = %e, "Failed to encode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Validates a token and returns the claims if the signature holds.
    #[instrument(skip(self, token))]
    pub fn validate_token(&self, token: &str) -> Result<AdminClaims, AppError> {
        decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &Validation::default(),
        )
        .map(|data| {
            debug!(subject = %data.claims.sub, "JWT token decoded successfully");
            data.claims
        })
        .map_err(|e| {
            debug!(error = %e, "Failed to decode JWT token");
            AppError::JwtError(e.to_string())
        })
    }

    /// Authorizes an administrative request from its bearer token.
    ///
    /// Runs before any data access: a missing or invalid token fails the
    /// request outright, a valid token without the admin claim is forbidden.
    pub fn require_admin(&self, headers: &HeaderMap) -> Result<AdminClaims, AppError> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = self
            .validate_token(token)
            .map_err(|_| AppError::Unauthorized("Invalid token".to_string()))?;
        if !claims.admin {
            return Err(AppError::Forbidden(
                "Administrative privileges required".to_string(),
            ));
        }
        Ok(claims)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::new()
    }
}
