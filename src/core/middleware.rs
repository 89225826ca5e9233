//! Session extraction.
//!
//! Handlers take a [`SessionUser`] argument to require an authenticated
//! caller. The session is a bearer JWT signed with `JWT_SECRET` (HS256) whose
//! `sub` claim is the user id.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::shared::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionUser {
    pub user_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Invalid user session")]
    InvalidSession,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

fn validate_jwt(token: &str, secret: &str) -> Result<TokenClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.set_required_spec_claims(&["exp"]);

    decode::<TokenClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected session token: {e}");
            AuthError::Unauthorized
        })
}

/// Resolves the caller from an `Authorization` header value.
pub fn authenticate(header: Option<&str>, secret: &str) -> Result<SessionUser, AuthError> {
    let token = header
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthorized)?;

    let claims = validate_jwt(token, secret)?;

    let user_id = claims
        .sub
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or(AuthError::InvalidSession)?;

    Ok(SessionUser { user_id })
}

/// Signs a session token for `user_id`. Used by tooling and tests.
pub fn issue_session_token(
    secret: &str,
    user_id: Uuid,
    ttl: chrono::Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = TokenClaims {
        sub: Some(user_id.to_string()),
        exp: (now + ttl).timestamp(),
        iat: Some(now.timestamp()),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for SessionUser {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        authenticate(header, &state.config.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    fn sign(claims: &TokenClaims, secret: &str) -> String {
        encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("sign")
    }

    fn future_exp() -> i64 {
        (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp()
    }

    #[test]
    fn test_valid_token_yields_user() {
        let user_id = Uuid::new_v4();
        let token = issue_session_token(SECRET, user_id, chrono::Duration::hours(1)).expect("token");
        let header = format!("Bearer {token}");
        let user = authenticate(Some(&header), SECRET).expect("authenticated");
        assert_eq!(user.user_id, user_id);
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthorized() {
        assert!(matches!(authenticate(None, SECRET), Err(AuthError::Unauthorized)));
        assert!(matches!(
            authenticate(Some("Basic abc"), SECRET),
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            authenticate(Some("Bearer not-a-jwt"), SECRET),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_wrong_secret_or_expired_is_unauthorized() {
        let token = issue_session_token("other", Uuid::new_v4(), chrono::Duration::hours(1)).expect("token");
        assert!(matches!(
            authenticate(Some(&format!("Bearer {token}")), SECRET),
            Err(AuthError::Unauthorized)
        ));

        let expired = sign(
            &TokenClaims {
                sub: Some(Uuid::new_v4().to_string()),
                exp: (chrono::Utc::now() - chrono::Duration::hours(2)).timestamp(),
                iat: None,
            },
            SECRET,
        );
        assert!(matches!(
            authenticate(Some(&format!("Bearer {expired}")), SECRET),
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_missing_or_bad_subject_is_invalid_session() {
        for sub in [None, Some(String::new()), Some("not-a-uuid".to_string())] {
            let token = sign(&TokenClaims { sub, exp: future_exp(), iat: None }, SECRET);
            assert!(matches!(
                authenticate(Some(&format!("Bearer {token}")), SECRET),
                Err(AuthError::InvalidSession)
            ));
        }
    }
}
