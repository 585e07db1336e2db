//! Account registration, credential checks and bearer tokens.
//!
//! Tokens are HS256 JWTs whose subject is the username. Task requests
//! resolve that username to a user id here, so the engine only ever sees
//! an integer owner id.

use crate::config::AuthConfig;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::User;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Clone)]
pub struct Authenticator {
    db: Database,
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Authenticator {
    pub fn new(db: Database, config: AuthConfig) -> Self {
        let secret = config.jwt_key.as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            db,
            config,
        }
    }

    pub fn register(&self, req: RegisterRequest) -> ApiResult<User> {
        let username = required(req.username, "username")?;
        let password = req
            .password
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ApiError::missing_field("password"))?;
        let email = req.email.map(|e| e.trim().to_string()).unwrap_or_default();

        let salt = Uuid::new_v4().simple().to_string();
        let hash = hash_password(&salt, &password);
        let user = self.db.insert_user(&username, &email, &hash, &salt)?;
        info!(user_id = user.id, username = %user.username, "registered user");
        Ok(user)
    }

    /// Check a username/password pair and issue a token.
    pub fn login(&self, req: LoginRequest) -> ApiResult<TokenResponse> {
        let username = required(req.username, "username")?;
        let password = req.password.unwrap_or_default();

        let Some(creds) = self.db.find_credentials(&username)? else {
            warn!(username = %username, "login for unknown user");
            return Err(invalid_credentials());
        };
        let computed = hash_password(&creds.password_salt, &password);
        if !constant_time_eq(computed.as_bytes(), creds.password_hash.as_bytes()) {
            warn!(username = %username, "login with wrong password");
            return Err(invalid_credentials());
        }

        let token = self.issue_token(&creds.user.username)?;
        debug!(user_id = creds.user.id, "issued token");
        Ok(TokenResponse { token })
    }

    pub fn issue_token(&self, username: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(self.config.token_ttl_minutes)).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(ApiError::internal)
    }

    /// Validate signature, issuer, audience and expiry.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.config.issuer.as_str()]);
        validation.set_audience(&[self.config.audience.as_str()]);
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| ApiError::unauthorized("Invalid or expired token").with_details(e.to_string()))
    }

    /// Resolve a bearer token to the id of an existing user.
    pub fn resolve_owner(&self, token: &str) -> ApiResult<i64> {
        let claims = self.verify(token)?;
        self.db
            .find_user_by_username(&claims.sub)?
            .map(|user| user.id)
            .ok_or_else(|| ApiError::unauthorized("Token subject is not a known user"))
    }
}

/// base64(SHA-256(salt ‖ password))
fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}

/// Constant-time comparison for stored password hashes.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

fn required(value: Option<String>, field: &str) -> ApiResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::missing_field(field))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid username or password")
}
