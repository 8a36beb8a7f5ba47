use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{
    config::AppConfig,
    error::AppError,
    models::TokenRequest,
};

/// Claims
///
/// Payload of the bearer tokens issued by `POST /api/jwt`. The email is the
/// caller's identity everywhere an operation needs one (voter, reporter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Expiration Time (exp). Always validated.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. No role is attached: the
/// token proves who the caller is, not what they may do.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub email: String,
    pub name: Option<String>,
    pub photo: Option<String>,
}

/// issue_token
///
/// Signs the requested claims (HS256) with `iat = now` and
/// `exp = now + token_ttl_secs`.
pub fn issue_token(config: &AppConfig, req: TokenRequest) -> Result<String, AppError> {
    let email = req.email.trim();
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Store(e.to_string()))?
        .as_secs();
    let ttl = config.token_ttl_secs;

    let claims = Claims {
        email: email.to_string(),
        name: req.name,
        photo: req.photo,
        iat: usize::try_from(now).unwrap_or(usize::MAX),
        exp: usize::try_from(now.saturating_add(ttl)).unwrap_or(usize::MAX),
    };

    let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| {
        tracing::error!("token signing failed: {:?}", e);
        AppError::Store(e.to_string())
    })
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument and as the guard of the
/// authenticated router.
///
/// 1. Local Bypass: in `Env::Local` an `x-user-email` header is trusted as-is.
/// 2. Token Extraction: `Authorization: Bearer <token>`; missing → 401.
/// 3. Token Validation: signature and expiry; any failure → 403.
///
/// Rejections are `AppError`s, so they carry the usual `{ "message" }` body.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = AppConfig::from_ref(state);

        if config.trusts_identity_header() {
            if let Some(email) = parts
                .headers
                .get("x-user-email")
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|email| !email.is_empty())
            {
                tracing::debug!(email, "local auth bypass");
                return Ok(AuthUser {
                    email: email.to_string(),
                    name: None,
                    photo: None,
                });
            }
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::Unauthorized)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::Unauthorized)?;

        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::debug!("token rejected: {:?}", e.kind());
            AppError::Forbidden
        })?;

        let claims = token_data.claims;
        Ok(AuthUser {
            email: claims.email,
            name: claims.name,
            photo: claims.photo,
        })
    }
}
