use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::access::Identity;
use crate::config::SessionConfig;

/// Claims carried by the short-lived access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Row id in `auth_sessions`; revoking the row invalidates the token
    pub sid: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl SessionClaims {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.sub,
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("session secret is not configured")]
    MissingSecret,

    #[error("failed to sign access token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("invalid access token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Signs and verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, access_ttl_secs: u64) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::seconds(access_ttl_secs as i64),
        })
    }

    pub fn from_config(config: &SessionConfig) -> Result<Self, TokenError> {
        Self::new(&config.jwt_secret, config.access_ttl_secs)
    }

    pub fn issue(&self, identity: &Identity, session_id: Uuid) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: identity.id,
            email: identity.email.clone(),
            sid: session_id,
            exp: (now + self.access_ttl).timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::Signing)
    }

    /// Checks signature and expiry
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

/// Fresh opaque refresh token
pub fn new_refresh_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Refresh tokens are stored hashed; this is the value kept in `auth_sessions`
pub fn hash_refresh_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
