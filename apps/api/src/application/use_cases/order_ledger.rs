use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::AppResult;
use crate::application::helpers::order_payload::OrderEvent;
use crate::application::use_cases::site::SiteProfile;
use crate::domain::entities::billing_period::BillingPeriod;
use crate::domain::entities::order::{LineItem, OrderEventKind, OrderStatus};

#[derive(Debug, Clone)]
pub struct OrderProfile {
    pub id: Uuid,
    pub site_id: Uuid,
    pub upstream_order_id: String,
    pub customer_ref: Option<String>,
    pub customer_email: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub line_items: Vec<LineItem>,
    pub billing_period_start: DateTime<Utc>,
    /// Inclusive: the last millisecond of the month.
    pub billing_period_end: DateTime<Utc>,
    pub metadata: Value,
    pub occurred_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub site_id: Uuid,
    pub upstream_order_id: String,
    pub customer_ref: Option<String>,
    pub customer_email: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: OrderStatus,
    pub line_items: Vec<LineItem>,
    pub period: BillingPeriod,
    pub metadata: Value,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum LedgerWrite {
    Inserted(OrderProfile),
    Duplicate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub order_count: i64,
    pub revenue_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteCounters {
    pub order_count: i64,
    pub revenue_cents: i64,
    pub last_order_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait OrderRepoTrait: Send + Sync {
    /// Insert the order and bump the site counters atomically.
    ///
    /// Returns `Duplicate` without touching the counters when the
    /// `(site_id, upstream_order_id)` pair already exists.
    async fn insert_completed_order(&self, order: &NewOrder) -> AppResult<LedgerWrite>;
    /// Completed orders of one site with `start <= occurred_at < end`.
    async fn usage_for_site(&self, site_id: Uuid, period: BillingPeriod) -> AppResult<UsageTotals>;
    /// Completed orders across all sites owned by the user with `start <= occurred_at < end`.
    async fn usage_for_user(&self, user_id: Uuid, period: BillingPeriod) -> AppResult<UsageTotals>;
    /// Rewrite the site counters from the orders table.
    async fn recompute_site_counters(&self, site_id: Uuid) -> AppResult<SiteCounters>;
}

#[derive(Debug, Clone)]
pub enum LedgerOutcome {
    Recorded(OrderProfile),
    DuplicateIgnored { upstream_order_id: String },
    Ignored { kind: OrderEventKind },
}

impl LedgerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerOutcome::Recorded(_) => "recorded",
            LedgerOutcome::DuplicateIgnored { .. } => "duplicate_ignored",
            LedgerOutcome::Ignored { .. } => "ignored",
        }
    }
}

#[derive(Clone)]
pub struct OrderLedger {
    orders: Arc<dyn OrderRepoTrait>,
}

impl OrderLedger {
    pub fn new(orders: Arc<dyn OrderRepoTrait>) -> Self {
        Self { orders }
    }

    /// Persist a completed order exactly once per `(site, upstream order id)`.
    #[instrument(skip(self, site, event), fields(site_id = %site.id, upstream_order_id = %event.upstream_order_id))]
    pub async fn record(&self, site: &SiteProfile, event: &OrderEvent) -> AppResult<LedgerOutcome> {
        if event.kind != OrderEventKind::Completed {
            return Ok(LedgerOutcome::Ignored {
                kind: event.kind.clone(),
            });
        }

        let order = NewOrder {
            site_id: site.id,
            upstream_order_id: event.upstream_order_id.clone(),
            customer_ref: event.customer_ref.clone(),
            customer_email: event.customer_email.clone(),
            amount_cents: event.amount_cents,
            currency: event.currency.clone(),
            status: event.status,
            line_items: event.line_items.clone(),
            period: BillingPeriod::month_containing(event.occurred_at),
            metadata: event.metadata.clone(),
            occurred_at: event.occurred_at,
        };

        match self.orders.insert_completed_order(&order).await? {
            LedgerWrite::Inserted(profile) => {
                tracing::info!(order_id = %profile.id, amount_cents = profile.amount_cents, "Order recorded");
                Ok(LedgerOutcome::Recorded(profile))
            }
            LedgerWrite::Duplicate => {
                tracing::info!("Duplicate order delivery ignored");
                Ok(LedgerOutcome::DuplicateIgnored {
                    upstream_order_id: order.upstream_order_id,
                })
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn reconcile_site(&self, site_id: Uuid) -> AppResult<SiteCounters> {
        let counters = self.orders.recompute_site_counters(site_id).await?;
        tracing::info!(
            order_count = counters.order_count,
            revenue_cents = counters.revenue_cents,
            "Site counters reconciled"
        );
        Ok(counters)
    }
}
