use chrono::Utc;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::event_verifier::EventVerifier,
    domain::entities::event::ProviderEvent,
};

type HmacSha256 = Hmac<Sha256>;

fn compute_v1(secret: &str, timestamp: &str, payload: &[u8]) -> AppResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Build a `Stripe-Signature` header value for `payload` signed at `timestamp`.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> AppResult<String> {
    let signature = compute_v1(secret, &timestamp.to_string(), payload)?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Checks `t=<ts>,v1=<hex>` signatures over `"<ts>.<payload>"`.
pub struct StripeSignatureVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl StripeSignatureVerifier {
    pub fn new(secret: SecretString, tolerance_secs: i64) -> Self {
        Self {
            secret,
            tolerance_secs,
        }
    }

    fn check_signature(&self, payload: &[u8], header: &str, now: i64) -> AppResult<()> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp
            .ok_or_else(|| AppError::SignatureInvalid("missing timestamp".into()))?;
        if signatures.is_empty() {
            return Err(AppError::SignatureInvalid("missing v1 signature".into()));
        }

        let expected = compute_v1(self.secret.expose_secret(), timestamp, payload)?;
        if !signatures.iter().any(|sig| constant_time_compare(sig, &expected)) {
            return Err(AppError::SignatureInvalid("signature mismatch".into()));
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| AppError::SignatureInvalid("invalid timestamp".into()))?;
        if self.tolerance_secs > 0 && (now - ts).abs() > self.tolerance_secs {
            return Err(AppError::SignatureInvalid("timestamp outside tolerance".into()));
        }
        Ok(())
    }
}

impl EventVerifier for StripeSignatureVerifier {
    fn verify(&self, payload: &[u8], signature: &str) -> AppResult<ProviderEvent> {
        self.check_signature(payload, signature, Utc::now().timestamp())?;
        serde_json::from_slice(payload)
            .map_err(|e| AppError::SignatureInvalid(format!("undecodable event: {}", e)))
    }
}
