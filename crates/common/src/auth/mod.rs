//! Authentication and identity utilities
//!
//! Provides:
//! - JWT credential issuance and verification
//! - Password hashing with argon2
//! - Identity extraction for protected handlers

use crate::errors::{AppError, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Verified identity available to handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Acting user; trusted for ownership checks
    pub user_id: i64,
}

/// Why a presented credential was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    Missing,
    Expired,
    Invalid,
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Missing => AppError::Unauthorized {
                message: "Token is missing".to_string(),
            },
            IdentityError::Expired => AppError::ExpiredToken,
            IdentityError::Invalid => AppError::InvalidToken,
        }
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,
}

/// JWT token manager
pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiration_secs: i64,
}

impl JwtManager {
    /// Create a new JWT manager with the given secret
    pub fn new(secret: &str, expiration_secs: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiration_secs: i64::try_from(expiration_secs).unwrap_or(i64::MAX),
        }
    }

    /// Generate a new JWT token for a user
    pub fn generate_token(&self, user_id: i64) -> Result<String> {
        self.generate_token_at(user_id, Utc::now().timestamp())
    }

    fn generate_token_at(&self, user_id: i64, issued_at: i64) -> Result<String> {
        let exp = issued_at.saturating_add(self.expiration_secs);

        let claims = JwtClaims {
            sub: user_id.to_string(),
            exp,
            iat: issued_at,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(|e| AppError::Internal {
            message: format!("Failed to generate token: {}", e),
        })
    }

    /// Validate and decode a JWT token
    pub fn validate_token(&self, token: &str) -> std::result::Result<JwtClaims, IdentityError> {
        decode::<JwtClaims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => IdentityError::Expired,
                _ => IdentityError::Invalid,
            })
    }

    /// Resolve the user id carried by a token
    pub fn verify(&self, token: &str) -> std::result::Result<i64, IdentityError> {
        let claims = self.validate_token(token)?;
        claims.sub.parse().map_err(|_| IdentityError::Invalid)
    }
}

/// Token from an Authorization header value, with or without the Bearer scheme
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let token = auth_header
        .strip_prefix("Bearer ")
        .unwrap_or(auth_header)
        .trim();

    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Hash a password into a PHC string
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal {
            message: format!("Failed to hash password: {}", e),
        })
}

/// Check a password against a stored PHC string
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is malformed");
            false
        }
    }
}

/// Axum extractor for AuthContext
impl<S> FromRequestParts<S> for AuthContext
where
    Arc<JwtManager>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let jwt = Arc::<JwtManager>::from_ref(state);

        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or(IdentityError::Missing)?;

        let user_id = jwt.verify(token)?;

        Ok(AuthContext { user_id })
    }
}
