use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::billing::BillingPortal;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Maximum age of a signed event.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
}

impl StripeClient {
    pub fn new(client: Client, secret_key: SecretString) -> Self {
        Self { client, secret_key }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    // ========================================================================
    // Customer Portal
    // ========================================================================

    pub async fn create_billing_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<StripePortalSession> {
        let params = [("customer", customer_id), ("return_url", return_url)];

        let response = self
            .client
            .post(format!("{}/billing_portal/sessions", STRIPE_API_BASE))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Webhook Signature Verification
    // ========================================================================

    /// Check a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`).
    ///
    /// The signed content is `"{t}.{raw body}"`. Events older or newer than
    /// [`SIGNATURE_TOLERANCE_SECS`] relative to `now` are rejected.
    pub fn verify_webhook_signature(
        payload: &[u8],
        signature_header: &str,
        webhook_secret: &SecretString,
        now: i64,
    ) -> AppResult<()> {
        let mut timestamp: Option<&str> = None;
        let mut signatures: Vec<&str> = Vec::new();

        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = Some(value),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(AppError::InvalidSignature)?;
        let ts: i64 = timestamp.parse().map_err(|_| AppError::InvalidSignature)?;
        if signatures.is_empty() || webhook_secret.expose_secret().is_empty() {
            return Err(AppError::InvalidSignature);
        }

        let matched = signatures.iter().any(|sig| {
            let Ok(provided) = hex::decode(sig) else {
                return false;
            };
            signed_mac(webhook_secret.expose_secret(), timestamp, payload)
                .is_some_and(|mac| mac.verify_slice(&provided).is_ok())
        });
        if !matched {
            return Err(AppError::InvalidSignature);
        }

        if (now - ts).abs() > SIGNATURE_TOLERANCE_SECS {
            tracing::warn!(timestamp = ts, "Stripe event outside tolerance window");
            return Err(AppError::InvalidSignature);
        }
        Ok(())
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::Internal(format!(
                    "Stripe error: {}",
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Internal(format!(
                "Stripe API error: {} - {}",
                status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Stripe response");
            AppError::Internal(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl BillingPortal for StripeClient {
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> AppResult<String> {
        self.create_billing_portal_session(customer_id, return_url)
            .await
            .map(|session| session.url)
    }
}

fn signed_mac(secret: &str, timestamp: &str, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Build a `Stripe-Signature` header value for `payload`.
#[cfg(test)]
pub fn sign_webhook_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let signature = signed_mac(secret, &timestamp.to_string(), payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={},v1={}", timestamp, signature)
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripePortalSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_706_500_000;
    const BODY: &[u8] = br#"{"id":"evt_1","type":"invoice.paid"}"#;

    fn secret() -> SecretString {
        SecretString::new(SECRET.into())
    }

    #[test]
    fn valid_signature_is_accepted() {
        let header = sign_webhook_payload(SECRET, NOW, BODY);
        assert!(StripeClient::verify_webhook_signature(BODY, &header, &secret(), NOW).is_ok());
    }

    #[test]
    fn any_matching_v1_entry_is_enough() {
        let valid = sign_webhook_payload(SECRET, NOW, BODY);
        let v1 = valid.split_once("v1=").unwrap().1;
        let header = format!("t={NOW},v1={},v1={v1}", "00".repeat(32));
        assert!(StripeClient::verify_webhook_signature(BODY, &header, &secret(), NOW).is_ok());
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let header = sign_webhook_payload(SECRET, NOW, BODY);
        let result = StripeClient::verify_webhook_signature(
            br#"{"id":"evt_2","type":"invoice.paid"}"#,
            &header,
            &secret(),
            NOW,
        );
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let header = sign_webhook_payload(SECRET, NOW - SIGNATURE_TOLERANCE_SECS - 1, BODY);
        let result = StripeClient::verify_webhook_signature(BODY, &header, &secret(), NOW);
        assert!(matches!(result, Err(AppError::InvalidSignature)));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        let timestamp_only = format!("t={NOW}");
        for header in ["", "v1=abc", "t=notanumber,v1=abc", timestamp_only.as_str()] {
            let result = StripeClient::verify_webhook_signature(BODY, header, &secret(), NOW);
            assert!(matches!(result, Err(AppError::InvalidSignature)), "{header}");
        }
    }
}
