use bcrypt::DEFAULT_COST;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Role;

/// bcrypt only looks at the first 72 bytes of its input.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("password hash error: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("token encode error: {0}")]
    Encode(jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    InvalidToken(jsonwebtoken::errors::Error),
}

fn truncated(password: &str) -> &[u8] {
    let bytes = password.as_bytes();
    &bytes[..bytes.len().min(MAX_PASSWORD_BYTES)]
}

/// Hash a new password with bcrypt. Store the returned string in users.password_hash.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, CredentialError> {
    Ok(bcrypt::hash(truncated(password), cost)?)
}

/// Verify password against the bcrypt hash stored in DB.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    bcrypt::verify(truncated(password), stored_hash).unwrap_or(false)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub user_id: i64,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Signs and validates HS256 bearer tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(&self, user_id: i64, role: Role) -> Result<String, CredentialError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(CredentialError::Encode)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, CredentialError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(CredentialError::InvalidToken)?;
        Ok(data.claims)
    }
}
