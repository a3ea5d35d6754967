//! JWT authentication for the signing API
//!
//! Each request gets a fresh HS256 token: the API key is the issuer, the
//! API secret the signing key. Tokens live for one minute and carry a
//! random `jti` so the server can reject replays.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AmoError, Result};

/// Token lifetime accepted by the signing API
pub const JWT_LIFETIME_SECS: u64 = 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// API key
    pub iss: String,
    /// Random nonce
    pub jti: String,
    /// Issued at
    pub iat: u64,
    /// Expiration
    pub exp: u64,
}

/// API credentials able to mint request tokens
#[derive(Clone)]
pub struct JwtAuth {
    api_key: String,
    api_secret: String,
}

impl JwtAuth {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// The API key (JWT issuer)
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Create a new signed token
    pub fn token(&self) -> Result<String> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AmoError::AuthFailed {
                message: format!("System clock error: {}", e),
            })?
            .as_secs();

        let claims = Claims {
            iss: self.api_key.clone(),
            jti: hex::encode(rand::random::<[u8; 16]>()),
            iat: now,
            exp: now + JWT_LIFETIME_SECS,
        };

        let key = EncodingKey::from_secret(self.api_secret.as_bytes());
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &key)?)
    }

    /// `Authorization` header value for a request
    pub fn header_value(&self) -> Result<String> {
        Ok(format!("JWT {}", self.token()?))
    }
}

// Never print the secret
impl fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuth")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}
