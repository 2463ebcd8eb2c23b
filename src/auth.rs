//! Bearer-token authentication.
//!
//! Tokens are issued by the accounts service; this service only verifies the
//! HS256 signature and expiry and reads the user id from `sub`.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication credentials were not provided")]
    MissingCredentials,

    #[error("Authorization header must use the Bearer scheme")]
    InvalidScheme,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

/// Verifies (and, for tooling and tests, issues) access tokens
pub struct JwtVerifier {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str, leeway_secs: u64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_secs;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(AuthUser { id: data.claims.sub })
    }

    pub fn issue(&self, user_id: Uuid, ttl_secs: i64) -> Result<String, AuthError> {
        let exp = (chrono::Utc::now().timestamp() + ttl_secs).max(0) as usize;
        let claims = Claims { sub: user_id, exp };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    /// Authenticate a request from its `Authorization` header
    pub fn authenticate(&self, req: &HttpRequest) -> Result<AuthUser, AuthError> {
        let header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AuthError::MissingCredentials)?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidScheme)?;

        self.verify(token)
    }
}

/// The authenticated caller, passed explicitly into service operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<JwtVerifier>>() {
            Some(verifier) => verifier.authenticate(req).map_err(|e| {
                tracing::debug!("Rejected request to {}: {}", req.path(), e);
                ApiError::from(e)
            }),
            None => {
                tracing::error!("JwtVerifier missing from application data");
                Err(ApiError::Internal("Authentication is not configured".to_string()))
            }
        };
        ready(result)
    }
}
