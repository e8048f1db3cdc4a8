//! Webhook signature checks.
//!
//! Cashfree signs every webhook delivery with `base64(HMAC-SHA256(timestamp + raw_body))`, keyed with the merchant's
//! secret. The signature and timestamp arrive in the `x-webhook-signature` and `x-webhook-timestamp` headers.
//! The body must be verified byte-for-byte as received, before it is parsed.
use hmac::{Hmac, Mac};
use log::trace;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub fn calculate_webhook_signature(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return String::default();
    };
    mac.update(timestamp.as_bytes());
    mac.update(body);
    base64::encode(mac.finalize().into_bytes())
}

/// Returns true iff `signature` is the valid signature for `timestamp` and `body` under `secret`.
///
/// An empty secret never validates anything.
pub fn verify_webhook_signature(signature: &str, body: &[u8], timestamp: &str, secret: &str) -> bool {
    if secret.is_empty() {
        trace!("🔐️ No webhook secret is configured. Signature rejected.");
        return false;
    }
    let Ok(expected) = base64::decode(signature.trim()) else {
        trace!("🔐️ Webhook signature is not valid base64.");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(timestamp.as_bytes());
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
