//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header carries a timestamp and one or more `v1` signatures:
//! `t=1712345678,v1=5257a86...`. The signed payload is `{t}.{raw body}` and the signature is
//! HMAC-SHA256 under the endpoint's webhook secret. Signatures older than the tolerance are
//! rejected to blunt replay attacks.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookVerificationError {
    #[error("The signature header is malformed")]
    MalformedHeader,
    #[error("The signature header carries no v1 signature")]
    MissingSignature,
    #[error("The signature timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,
    #[error("No signature matched the payload")]
    SignatureMismatch,
}

/// Verify a webhook payload against its `Stripe-Signature` header.
///
/// `now` is the verifier's clock as a unix timestamp; callers pass `Utc::now().timestamp()` and
/// tests pass a fixed value.
pub fn verify_webhook_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), WebhookVerificationError> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();
    for part in signature_header.split(',') {
        let mut kv = part.trim().splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some("t"), Some(v)) => {
                timestamp = Some(v.parse().map_err(|_| WebhookVerificationError::MalformedHeader)?);
            },
            (Some("v1"), Some(v)) => {
                let sig = hex::decode(v).map_err(|_| WebhookVerificationError::MalformedHeader)?;
                signatures.push(sig);
            },
            // Unknown schemes (v0 etc.) are ignored, as Stripe documents.
            (Some(_), Some(_)) => {},
            _ => return Err(WebhookVerificationError::MalformedHeader),
        }
    }
    let timestamp = timestamp.ok_or(WebhookVerificationError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(WebhookVerificationError::MissingSignature);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(WebhookVerificationError::TimestampOutOfTolerance);
    }

    let mut signed_payload = timestamp.to_string().into_bytes();
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);
    // verify_slice is constant time.
    let matched = signatures.iter().any(|sig| {
        let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };
        mac.update(&signed_payload);
        mac.verify_slice(sig).is_ok()
    });
    if matched {
        Ok(())
    } else {
        Err(WebhookVerificationError::SignatureMismatch)
    }
}
