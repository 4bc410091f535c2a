//! Storefront webhook authentication.
//!
//! The storefront signs each delivery with `base64(HMAC-SHA256(secret, raw_body))`
//! in the `X-WC-Webhook-Signature` header. Hex-encoded digests are accepted too.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::application::use_cases::order_webhook::SignatureVerifier;

type HmacSha256 = Hmac<Sha256>;

pub struct WebhookSignatureVerifier {
    secret: SecretString,
}

impl WebhookSignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self, raw_body: &[u8]) -> Option<HmacSha256> {
        let secret = self.secret.expose_secret();
        if secret.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
        mac.update(raw_body);
        Some(mac)
    }
}

impl SignatureVerifier for WebhookSignatureVerifier {
    fn verify(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        let Some(signature) = signature.map(str::trim).filter(|s| !s.is_empty()) else {
            return false;
        };
        let Some(provided) = decode_digest(signature) else {
            return false;
        };
        match self.mac(raw_body) {
            // Constant-time comparison.
            Some(mac) => mac.verify_slice(&provided).is_ok(),
            None => false,
        }
    }
}

/// SHA-256 digests are 32 bytes; anything else cannot match.
fn decode_digest(signature: &str) -> Option<Vec<u8>> {
    if signature.len() == 64 && signature.chars().all(|c| c.is_ascii_hexdigit()) {
        return hex::decode(signature).ok();
    }
    STANDARD
        .decode(signature)
        .ok()
        .filter(|bytes| bytes.len() == 32)
}

/// Produce the header value the storefront would send for `raw_body`.
pub fn sign_payload(secret: &str, raw_body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(raw_body);
    STANDARD.encode(mac.finalize().into_bytes())
}
