//! Inbound webhook authentication.
//!
//! Callers sign the raw request body with HMAC-SHA256 using the shared
//! `WEBHOOK_SECRET` and send `X-Webhook-Signature: v1=<hex digest>`.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hmac::{Hmac, Mac};
use log::warn;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";
const SIGNATURE_VERSION: &str = "v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureValidation {
    Valid,
    Missing,
    Invalid,
}

impl SignatureValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Invalid webhook signature")]
    InvalidSignature,
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// `v1=<hex>` signature of `body`.
pub fn sign_payload(body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!(
        "{}={}",
        SIGNATURE_VERSION,
        hex::encode(mac.finalize().into_bytes())
    ))
}

pub fn parse_signature_header(header: &str) -> Option<(&str, &str)> {
    header.trim().split_once('=')
}

pub fn verify_signature(body: &[u8], header: Option<&str>, secret: &str) -> SignatureValidation {
    let Some(header) = header.filter(|h| !h.trim().is_empty()) else {
        return SignatureValidation::Missing;
    };
    let Some((version, digest)) = parse_signature_header(header) else {
        return SignatureValidation::Invalid;
    };
    if version != SIGNATURE_VERSION {
        return SignatureValidation::Invalid;
    }
    let Ok(expected) = hex::decode(digest) else {
        return SignatureValidation::Invalid;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return SignatureValidation::Invalid;
    };
    mac.update(body);
    // verify_slice compares in constant time.
    match mac.verify_slice(&expected) {
        Ok(()) => SignatureValidation::Valid,
        Err(_) => SignatureValidation::Invalid,
    }
}

/// Checks the request when a secret is configured; passes everything otherwise.
pub fn verify_webhook(headers: &HeaderMap, body: &[u8], secret: Option<&str>) -> Result<(), WebhookError> {
    let Some(secret) = secret else {
        return Ok(());
    };
    let header = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    match verify_signature(body, header, secret) {
        SignatureValidation::Valid => Ok(()),
        outcome => {
            warn!("Rejected webhook: signature {outcome:?}");
            Err(WebhookError::InvalidSignature)
        }
    }
}
