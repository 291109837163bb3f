//! Shared-secret webhook signatures.
//!
//! The signature is `hex(HMAC-SHA256(secret, raw_body))`, optionally prefixed
//! with `sha256=`, carried in a configurable header.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticationError {
    #[error("no webhook secret is configured")]
    SecretNotConfigured,
    #[error("webhook secret rejected by HMAC")]
    InvalidSecret,
    #[error("missing signature header {0}")]
    MissingSignature(String),
    #[error("malformed signature")]
    MalformedSignature,
    #[error("signature mismatch")]
    SignatureMismatch,
}

/// `sha256=<hex>` signature of `payload`.
pub fn sign_payload(secret: &[u8], payload: &[u8]) -> Result<String, AuthenticationError> {
    let mut mac = hmac_for(secret)?;
    mac.update(payload);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check `signature` against `payload` in constant time.
pub fn verify_signature(
    secret: &[u8],
    payload: &[u8],
    signature: &str,
) -> Result<(), AuthenticationError> {
    let encoded = signature.trim();
    let encoded = encoded.strip_prefix(SIGNATURE_PREFIX).unwrap_or(encoded);
    let expected = hex::decode(encoded).map_err(|_| AuthenticationError::MalformedSignature)?;

    let mut mac = hmac_for(secret)?;
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| AuthenticationError::SignatureMismatch)
}

fn hmac_for(secret: &[u8]) -> Result<HmacSha256, AuthenticationError> {
    HmacSha256::new_from_slice(secret).map_err(|_| AuthenticationError::InvalidSecret)
}

/// Boundary policy for the webhook signature.
///
/// Without a secret every request is rejected, unless unsigned requests were
/// explicitly allowed.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Option<String>,
    header: String,
    allow_unsigned: bool,
}

impl SignatureVerifier {
    pub fn new(secret: Option<String>, header: impl Into<String>, allow_unsigned: bool) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
            header: header.into(),
            allow_unsigned,
        }
    }

    /// No secret and unsigned requests allowed: every request passes.
    pub fn unsigned() -> Self {
        Self::new(None, "X-Hub-Signature-256", true)
    }

    pub fn has_secret(&self) -> bool {
        self.secret.is_some()
    }

    pub fn allows_unsigned(&self) -> bool {
        self.secret.is_none() && self.allow_unsigned
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), AuthenticationError> {
        let Some(secret) = &self.secret else {
            return if self.allow_unsigned {
                Ok(())
            } else {
                Err(AuthenticationError::SecretNotConfigured)
            };
        };

        let signature = headers
            .get(self.header.as_str())
            .ok_or_else(|| AuthenticationError::MissingSignature(self.header.clone()))?
            .to_str()
            .map_err(|_| AuthenticationError::MalformedSignature)?;

        verify_signature(secret.as_bytes(), body, signature)
    }
}
