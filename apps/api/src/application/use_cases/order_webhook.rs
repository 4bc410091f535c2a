//! Order webhook flow: verify, parse, resolve the site, record, refresh billing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::helpers::order_payload::parse_order_webhook;
use crate::application::use_cases::billing::BillingUseCases;
use crate::application::use_cases::failure_notifier::{FailureContext, FailureNotifier};
use crate::application::use_cases::order_ledger::{LedgerOutcome, OrderLedger};
use crate::application::use_cases::site_resolver::SiteResolver;
use crate::domain::entities::order::OrderEventKind;

/// Authenticates raw webhook bodies.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, raw_body: &[u8], signature: Option<&str>) -> bool;
}

/// One inbound delivery as received on the wire.
#[derive(Debug, Clone, Copy)]
pub struct WebhookDelivery<'a> {
    pub body: &'a [u8],
    pub signature: Option<&'a str>,
    pub source: Option<&'a str>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookReceipt {
    pub outcome: &'static str,
    pub upstream_order_id: String,
    pub order_id: Option<Uuid>,
    pub site_id: Option<Uuid>,
    pub kind: String,
}

#[derive(Clone)]
pub struct OrderWebhookUseCases {
    verifier: Arc<dyn SignatureVerifier>,
    resolver: SiteResolver,
    ledger: OrderLedger,
    billing: Arc<BillingUseCases>,
    notifier: Arc<FailureNotifier>,
}

impl OrderWebhookUseCases {
    pub fn new(
        verifier: Arc<dyn SignatureVerifier>,
        resolver: SiteResolver,
        ledger: OrderLedger,
        billing: Arc<BillingUseCases>,
        notifier: Arc<FailureNotifier>,
    ) -> Self {
        Self {
            verifier,
            resolver,
            ledger,
            billing,
            notifier,
        }
    }

    /// Process one delivery.
    ///
    /// Every failure branch notifies the administrative recipient before
    /// returning the error. Non-completed events are acknowledged without
    /// looking up the site.
    #[instrument(skip(self, delivery), fields(source = delivery.source))]
    pub async fn handle_delivery(&self, delivery: WebhookDelivery<'_>) -> AppResult<WebhookReceipt> {
        if !self.verifier.verify(delivery.body, delivery.signature) {
            self.notifier
                .notify(FailureContext::invalid_signature(delivery.source))
                .await;
            return Err(AppError::InvalidSignature);
        }

        let event = match parse_order_webhook(delivery.body, delivery.source, delivery.received_at)
        {
            Ok(event) => event,
            Err(e) => {
                self.notifier
                    .notify(FailureContext::malformed_payload(&e, delivery.source))
                    .await;
                return Err(AppError::MalformedPayload(e));
            }
        };

        if event.kind != OrderEventKind::Completed {
            tracing::info!(
                kind = event.kind.as_str(),
                upstream_order_id = %event.upstream_order_id,
                "Ignoring non-completed order event"
            );
            return Ok(WebhookReceipt {
                outcome: "ignored",
                upstream_order_id: event.upstream_order_id,
                order_id: None,
                site_id: None,
                kind: event.kind.as_str().to_string(),
            });
        }

        let site = match self.resolver.resolve(&event.site_ref).await {
            Ok(site) => site,
            Err(AppError::SiteNotFound(site_ref)) => {
                self.notifier
                    .notify(FailureContext::site_not_found(&site_ref))
                    .await;
                return Err(AppError::SiteNotFound(site_ref));
            }
            Err(e) => {
                self.notifier
                    .notify(FailureContext::processing_failure(
                        &e,
                        Some(&event.upstream_order_id),
                    ))
                    .await;
                return Err(e);
            }
        };

        let outcome = match self.ledger.record(&site, &event).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.notifier
                    .notify(FailureContext::processing_failure(
                        &e,
                        Some(&event.upstream_order_id),
                    ))
                    .await;
                return Err(e);
            }
        };

        let order_id = match &outcome {
            LedgerOutcome::Recorded(order) => {
                self.billing
                    .refresh_usage_snapshot(site.user_id, delivery.received_at)
                    .await;
                Some(order.id)
            }
            LedgerOutcome::DuplicateIgnored { .. } | LedgerOutcome::Ignored { .. } => None,
        };

        Ok(WebhookReceipt {
            outcome: outcome.as_str(),
            upstream_order_id: event.upstream_order_id,
            order_id,
            site_id: Some(site.id),
            kind: event.kind.as_str().to_string(),
        })
    }
}
