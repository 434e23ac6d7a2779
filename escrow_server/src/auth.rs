//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs carrying the user id and roles. The marketplace's identity service
//! issues them; [`TokenIssuer`] exists so tests and operator tooling can mint their own against
//! the shared secret.
use std::future::{ready, Ready};

use actix_web::{FromRequest, HttpRequest};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const AUTH_HEADER: &str = "meg-access-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The authenticated user id.
    pub sub: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Expiry, unix seconds. Validated by `jsonwebtoken`.
    pub exp: i64,
}

impl JwtClaims {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Admins may act on any transaction; everyone else must be the named user.
    pub fn require_self_or_admin(&self, user_id: &str) -> Result<(), ServerError> {
        if self.sub == user_id || self.is_admin() {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions("You cannot act on another user's behalf.".to_string()))
        }
    }

    pub fn require_admin(&self) -> Result<(), ServerError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ServerError::InsufficientPermissions("This operation requires the admin role.".to_string()))
        }
    }
}

/// Issues and validates the server's bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenIssuer")
    }
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.reveal().as_bytes();
        Self { encoding_key: EncodingKey::from_secret(secret), decoding_key: DecodingKey::from_secret(secret) }
    }

    pub fn issue(&self, user_id: &str, roles: Vec<Role>, validity: Duration) -> Result<String, ServerError> {
        let claims = JwtClaims { sub: user_id.to_string(), roles, exp: (Utc::now() + validity).timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServerError::Unspecified(format!("Could not sign access token. {e}")))
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::ValidationError(e.to_string()))
    }
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(extract_claims(req))
    }
}

fn extract_claims(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let issuer = req
        .app_data::<actix_web::web::Data<TokenIssuer>>()
        .ok_or_else(|| ServerError::InitializeError("TokenIssuer is not registered with the app".to_string()))?;
    let header = req.headers().get(AUTH_HEADER).ok_or(AuthError::MissingToken)?;
    let raw = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = raw.strip_prefix("Bearer ").unwrap_or(raw);
    Ok(issuer.validate(token)?)
}
