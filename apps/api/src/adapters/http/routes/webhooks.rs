use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, response::ok},
    app_error::{AppError, AppResult},
    application::use_cases::{
        failure_notifier::FailureContext,
        order_webhook::{WebhookDelivery, WebhookReceipt},
    },
    infra::stripe_client::StripeClient,
};

pub const WOOCOMMERCE_SIGNATURE_HEADER: &str = "x-wc-webhook-signature";
pub const WOOCOMMERCE_SOURCE_HEADER: &str = "x-wc-webhook-source";
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/woocommerce", post(woocommerce_webhook))
        .route("/stripe", post(stripe_webhook))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ============================================================================
// Storefront order webhooks
// ============================================================================

#[derive(Serialize)]
struct OrderWebhookResponse {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    order_id: Option<Uuid>,
    upstream_order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    site_id: Option<Uuid>,
    kind: String,
}

impl From<WebhookReceipt> for OrderWebhookResponse {
    fn from(receipt: WebhookReceipt) -> Self {
        Self {
            outcome: receipt.outcome,
            order_id: receipt.order_id,
            upstream_order_id: receipt.upstream_order_id,
            site_id: receipt.site_id,
            kind: receipt.kind,
        }
    }
}

/// The body is taken as raw bytes; the signature covers them exactly.
async fn woocommerce_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let receipt = app_state
        .order_webhook_use_cases
        .handle_delivery(WebhookDelivery {
            body: &body,
            signature: header_str(&headers, WOOCOMMERCE_SIGNATURE_HEADER),
            source: header_str(&headers, WOOCOMMERCE_SOURCE_HEADER),
            received_at: Utc::now(),
        })
        .await?;

    Ok(ok(OrderWebhookResponse::from(receipt)))
}

// ============================================================================
// Payment processor webhooks
// ============================================================================

#[derive(Serialize)]
struct PaymentWebhookResponse {
    received: bool,
    outcome: &'static str,
}

/// Only storage failures are answered with an error so the processor retries.
/// Everything else is acknowledged.
async fn stripe_webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let now = Utc::now();
    let verified = header_str(&headers, STRIPE_SIGNATURE_HEADER)
        .ok_or(AppError::InvalidSignature)
        .and_then(|signature| {
            StripeClient::verify_webhook_signature(
                &body,
                signature,
                &app_state.config.stripe_webhook_secret,
                now.timestamp(),
            )
        });
    if let Err(e) = verified {
        app_state
            .failure_notifier
            .notify(FailureContext::invalid_signature(Some("stripe")))
            .await;
        return Err(e);
    }

    let event: Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::InvalidInput(format!("Event body is not JSON: {e}")))?;

    match app_state
        .payment_webhook_use_cases
        .handle_event(&event, now)
        .await
    {
        Ok(outcome) => Ok(ok(PaymentWebhookResponse {
            received: true,
            outcome: outcome.as_str(),
        })),
        Err(e) if e.is_retryable() => {
            app_state
                .failure_notifier
                .notify(FailureContext::payment_webhook_failure(
                    &e,
                    event["type"].as_str().unwrap_or("unknown"),
                    event["id"].as_str().unwrap_or("unknown"),
                ))
                .await;
            Err(e)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Payment event rejected, acknowledging");
            Ok(ok(PaymentWebhookResponse {
                received: true,
                outcome: "rejected",
            }))
        }
    }
}
