//! Stripe event handling for the platform's own subscriptions.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::billing::{BillingRepoTrait, NewPayment, SubscriptionLink};
use crate::application::use_cases::user::UserRepoTrait;
use crate::domain::entities::billing::{PaymentStatus, SubscriptionStatus};

/// Length of the period granted by a completed checkout.
const CHECKOUT_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentEventOutcome {
    Processed,
    AlreadyProcessed,
    Skipped(&'static str),
}

impl PaymentEventOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentEventOutcome::Processed => "processed",
            PaymentEventOutcome::AlreadyProcessed => "already_processed",
            PaymentEventOutcome::Skipped(_) => "skipped",
        }
    }
}

#[derive(Clone)]
pub struct PaymentWebhookUseCases {
    billing: Arc<dyn BillingRepoTrait>,
    users: Arc<dyn UserRepoTrait>,
}

impl PaymentWebhookUseCases {
    pub fn new(billing: Arc<dyn BillingRepoTrait>, users: Arc<dyn UserRepoTrait>) -> Self {
        Self { billing, users }
    }

    /// Apply one verified event. Events are recorded as processed only after
    /// they were handled, so a failed attempt is retried by the sender.
    #[instrument(skip(self, event), fields(event_id = tracing::field::Empty, event_type = tracing::field::Empty))]
    pub async fn handle_event(
        &self,
        event: &Value,
        now: DateTime<Utc>,
    ) -> AppResult<PaymentEventOutcome> {
        let event_id = event["id"]
            .as_str()
            .ok_or_else(|| AppError::InvalidInput("Event id missing".into()))?;
        let event_type = event["type"]
            .as_str()
            .ok_or_else(|| AppError::InvalidInput("Event type missing".into()))?;
        tracing::Span::current()
            .record("event_id", event_id)
            .record("event_type", event_type);

        if self.billing.is_event_processed(event_id).await? {
            tracing::info!("Event already processed");
            return Ok(PaymentEventOutcome::AlreadyProcessed);
        }

        let object = &event["data"]["object"];
        let created = event["created"]
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or(now);

        let outcome = match event_type {
            "checkout.session.completed" => self.handle_checkout_completed(object, created).await?,
            "invoice.paid" | "invoice.payment_succeeded" => {
                self.handle_invoice(object, PaymentStatus::Succeeded, created)
                    .await?
            }
            "invoice.payment_failed" => {
                self.handle_invoice(object, PaymentStatus::Failed, created)
                    .await?
            }
            "customer.subscription.updated" | "customer.subscription.deleted" => {
                self.handle_subscription_change(object, event_type.ends_with("deleted"))
                    .await?
            }
            _ => PaymentEventOutcome::Skipped("unhandled event type"),
        };

        if let PaymentEventOutcome::Skipped(reason) = &outcome {
            tracing::info!(reason, "Event skipped");
        }

        self.billing
            .mark_event_processed(event_id, event_type)
            .await?;
        Ok(outcome)
    }

    async fn handle_checkout_completed(
        &self,
        session: &Value,
        created: DateTime<Utc>,
    ) -> AppResult<PaymentEventOutcome> {
        let user_ref = session["metadata"]["userId"]
            .as_str()
            .or_else(|| session["client_reference_id"].as_str());
        let Some(user_id) = user_ref.and_then(|r| Uuid::parse_str(r).ok()) else {
            return Ok(PaymentEventOutcome::Skipped("no user reference"));
        };
        let Some(user) = self.users.get_by_id(user_id).await? else {
            return Ok(PaymentEventOutcome::Skipped("unknown user"));
        };
        let Some(customer_id) = session["customer"].as_str() else {
            return Ok(PaymentEventOutcome::Skipped("no customer"));
        };

        if let Some(site_id) = session["metadata"]["siteId"].as_str() {
            tracing::info!(site_id, plan = session["metadata"]["planType"].as_str(), "Checkout for site");
        }

        let invoice_email = session["customer_details"]["email"]
            .as_str()
            .or_else(|| session["customer_email"].as_str())
            .unwrap_or(&user.email)
            .to_string();

        self.billing
            .upsert_subscription(&SubscriptionLink {
                user_id,
                stripe_customer_id: customer_id.to_string(),
                stripe_subscription_id: session["subscription"].as_str().map(str::to_string),
                stripe_subscription_item_id: None,
                status: SubscriptionStatus::Active,
                period_start: created,
                period_end: created + Duration::days(CHECKOUT_PERIOD_DAYS),
                invoice_email,
            })
            .await?;
        self.users
            .set_stripe_customer_id(user_id, customer_id)
            .await?;

        if session["payment_status"].as_str() == Some("paid") {
            if let Some(amount) = session["amount_total"].as_i64() {
                let reference = session["payment_intent"]
                    .as_str()
                    .or_else(|| session["id"].as_str())
                    .unwrap_or_default();
                self.billing
                    .append_payment(&NewPayment {
                        user_id,
                        amount_cents: amount,
                        currency: currency_of(session),
                        status: PaymentStatus::Succeeded,
                        processor_reference: reference.to_string(),
                        paid_at: created,
                    })
                    .await?;
            }
        }

        tracing::info!(user_id = %user_id, "Subscription activated");
        Ok(PaymentEventOutcome::Processed)
    }

    async fn handle_invoice(
        &self,
        invoice: &Value,
        status: PaymentStatus,
        created: DateTime<Utc>,
    ) -> AppResult<PaymentEventOutcome> {
        let Some(customer_id) = invoice["customer"].as_str() else {
            return Ok(PaymentEventOutcome::Skipped("no customer"));
        };
        let Some(billing) = self.billing.get_by_customer_id(customer_id).await? else {
            return Ok(PaymentEventOutcome::Skipped("unknown customer"));
        };
        let Some(invoice_id) = invoice["id"].as_str() else {
            return Ok(PaymentEventOutcome::Skipped("no invoice id"));
        };

        let amount = match status {
            PaymentStatus::Failed => invoice["amount_due"].as_i64(),
            _ => invoice["amount_paid"].as_i64(),
        }
        .unwrap_or(0);
        let paid_at = invoice["status_transitions"]["paid_at"]
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or(created);

        let appended = self
            .billing
            .append_payment(&NewPayment {
                user_id: billing.user_id,
                amount_cents: amount,
                currency: currency_of(invoice),
                status,
                processor_reference: invoice_id.to_string(),
                paid_at,
            })
            .await?;
        if !appended {
            tracing::debug!(invoice_id, "Payment already recorded");
        }

        let next_status = match (status, billing.subscription_status) {
            (PaymentStatus::Failed, _) => Some(SubscriptionStatus::PastDue),
            (PaymentStatus::Succeeded, SubscriptionStatus::PastDue | SubscriptionStatus::Unpaid) => {
                Some(SubscriptionStatus::Active)
            }
            _ => None,
        };
        if let Some(next) = next_status {
            self.billing
                .update_subscription_status(billing.user_id, next, None, None)
                .await?;
            tracing::info!(user_id = %billing.user_id, status = next.as_str(), "Subscription status changed");
        }

        Ok(PaymentEventOutcome::Processed)
    }

    async fn handle_subscription_change(
        &self,
        subscription: &Value,
        deleted: bool,
    ) -> AppResult<PaymentEventOutcome> {
        let billing = match subscription["id"].as_str() {
            Some(sub_id) => self.billing.get_by_subscription_id(sub_id).await?,
            None => None,
        };
        let billing = match (billing, subscription["customer"].as_str()) {
            (Some(b), _) => Some(b),
            (None, Some(customer_id)) => self.billing.get_by_customer_id(customer_id).await?,
            (None, None) => None,
        };
        let Some(billing) = billing else {
            return Ok(PaymentEventOutcome::Skipped("unknown subscription"));
        };

        let status = if deleted {
            SubscriptionStatus::Canceled
        } else {
            subscription["status"]
                .as_str()
                .map(SubscriptionStatus::from_str)
                .unwrap_or(billing.subscription_status)
        };
        let period_start = timestamp(&subscription["current_period_start"]);
        let period_end = timestamp(&subscription["current_period_end"]);

        self.billing
            .update_subscription_status(billing.user_id, status, period_start, period_end)
            .await?;
        tracing::info!(user_id = %billing.user_id, status = status.as_str(), "Subscription updated");
        Ok(PaymentEventOutcome::Processed)
    }
}

fn currency_of(object: &Value) -> String {
    object["currency"]
        .as_str()
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| "EUR".to_string())
}

fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_i64()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}
