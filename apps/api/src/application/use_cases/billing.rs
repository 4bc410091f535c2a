use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::app_error::{AppError, AppResult};
use crate::application::use_cases::order_ledger::{OrderRepoTrait, UsageTotals};
use crate::application::use_cases::site::SiteRepoTrait;
use crate::application::use_cases::user::Principal;
use crate::domain::entities::billing::{
    BillingPricing, MonthlyBill, PaymentStatus, SubscriptionStatus,
};
use crate::domain::entities::billing_period::BillingPeriod;

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    pub order_count: i64,
    pub revenue_cents: i64,
    pub base_cents: i64,
    pub fee_cents: i64,
    pub total_cents: i64,
    pub refreshed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct BillingProfile {
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: Option<String>,
    pub stripe_subscription_item_id: Option<String>,
    pub subscription_status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub usage: UsageSnapshot,
    pub invoice_email: String,
    pub invoice_business_name: Option<String>,
    pub invoice_vat_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub processor_reference: String,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Subscription linkage written when a checkout completes.
#[derive(Debug, Clone)]
pub struct SubscriptionLink {
    pub user_id: Uuid,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: Option<String>,
    pub stripe_subscription_item_id: Option<String>,
    pub status: SubscriptionStatus,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub invoice_email: String,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub processor_reference: String,
    pub paid_at: DateTime<Utc>,
}

#[async_trait]
pub trait BillingRepoTrait: Send + Sync {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<BillingProfile>>;
    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<BillingProfile>>;
    async fn get_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<BillingProfile>>;
    async fn upsert_subscription(&self, link: &SubscriptionLink) -> AppResult<BillingProfile>;
    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
    /// Returns false when the user has no billing row yet.
    async fn update_usage_snapshot(&self, user_id: Uuid, snapshot: &UsageSnapshot)
    -> AppResult<bool>;
    /// Returns false when a payment with the same processor reference exists.
    async fn append_payment(&self, payment: &NewPayment) -> AppResult<bool>;
    async fn list_payments(&self, user_id: Uuid) -> AppResult<Vec<PaymentRecord>>;
    async fn is_event_processed(&self, event_id: &str) -> AppResult<bool>;
    async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> AppResult<()>;
}

/// Payment processor's self-service page.
#[async_trait]
pub trait BillingPortal: Send + Sync {
    async fn create_portal_session(&self, customer_id: &str, return_url: &str)
    -> AppResult<String>;
}

// ============================================================================
// Read models
// ============================================================================

#[derive(Debug, Clone)]
pub struct PeriodBreakdown {
    pub period: BillingPeriod,
    pub usage: UsageTotals,
    pub bill: MonthlyBill,
}

#[derive(Debug, Clone)]
pub struct SiteBillingStats {
    pub site_id: Uuid,
    pub domain: String,
    pub current_month: PeriodBreakdown,
    pub previous_month: PeriodBreakdown,
}

#[derive(Debug, Clone)]
pub struct BillingOverview {
    pub user_id: Uuid,
    pub current_month: PeriodBreakdown,
    pub previous_month: PeriodBreakdown,
    pub subscription: Option<BillingProfile>,
    pub payments: Vec<PaymentRecord>,
}

// ============================================================================
// Use cases
// ============================================================================

#[derive(Clone)]
pub struct BillingUseCases {
    billing: Arc<dyn BillingRepoTrait>,
    orders: Arc<dyn OrderRepoTrait>,
    sites: Arc<dyn SiteRepoTrait>,
    portal: Arc<dyn BillingPortal>,
    pricing: BillingPricing,
}

impl BillingUseCases {
    pub fn new(
        billing: Arc<dyn BillingRepoTrait>,
        orders: Arc<dyn OrderRepoTrait>,
        sites: Arc<dyn SiteRepoTrait>,
        portal: Arc<dyn BillingPortal>,
        pricing: BillingPricing,
    ) -> Self {
        Self {
            billing,
            orders,
            sites,
            portal,
            pricing,
        }
    }

    /// Current and previous calendar month for one site.
    #[instrument(skip(self))]
    pub async fn site_billing_stats(
        &self,
        principal: &Principal,
        site_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<SiteBillingStats> {
        let site = self
            .sites
            .get_by_id(site_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !principal.can_access(site.user_id) {
            return Err(AppError::NotFound);
        }

        let current = BillingPeriod::month_containing(now);
        let previous = current.previous();

        let current_usage = self
            .orders
            .usage_for_site(site.id, current)
            .await?;
        let previous_usage = self
            .orders
            .usage_for_site(site.id, previous)
            .await?;

        Ok(SiteBillingStats {
            site_id: site.id,
            domain: site.domain,
            current_month: self.breakdown(current, current_usage),
            previous_month: self.breakdown(previous, previous_usage),
        })
    }

    /// Usage across all of the caller's sites plus subscription state.
    #[instrument(skip(self))]
    pub async fn user_billing_overview(
        &self,
        principal: &Principal,
        now: DateTime<Utc>,
    ) -> AppResult<BillingOverview> {
        let user_id = principal.user_id;
        let current = BillingPeriod::month_containing(now);
        let previous = current.previous();

        let current_usage = self
            .orders
            .usage_for_user(user_id, current)
            .await?;
        let previous_usage = self
            .orders
            .usage_for_user(user_id, previous)
            .await?;

        Ok(BillingOverview {
            user_id,
            current_month: self.breakdown(current, current_usage),
            previous_month: self.breakdown(previous, previous_usage),
            subscription: self.billing.get_by_user(user_id).await?,
            payments: self.billing.list_payments(user_id).await?,
        })
    }

    /// Recompute the current-month usage snapshot stored on the billing row.
    ///
    /// The snapshot is derivable from the orders table at any time, so
    /// failures here are logged and not propagated.
    #[instrument(skip(self))]
    pub async fn refresh_usage_snapshot(&self, user_id: Uuid, now: DateTime<Utc>) {
        let period = BillingPeriod::month_containing(now);
        let usage = match self
            .orders
            .usage_for_user(user_id, period)
            .await
        {
            Ok(usage) => usage,
            Err(e) => {
                tracing::warn!(error = %e, "Could not compute usage for snapshot");
                return;
            }
        };

        let bill = self.pricing.bill(usage.order_count);
        let snapshot = UsageSnapshot {
            order_count: usage.order_count,
            revenue_cents: usage.revenue_cents,
            base_cents: bill.base_cents,
            fee_cents: bill.usage_cents,
            total_cents: bill.total_cents,
            refreshed_at: Some(now),
        };

        match self.billing.update_usage_snapshot(user_id, &snapshot).await {
            Ok(true) => tracing::debug!(order_count = usage.order_count, "Usage snapshot refreshed"),
            Ok(false) => tracing::debug!("No billing record yet, snapshot skipped"),
            Err(e) => tracing::warn!(error = %e, "Could not store usage snapshot"),
        }
    }

    #[instrument(skip(self))]
    pub async fn portal_url(&self, principal: &Principal, return_url: &str) -> AppResult<String> {
        let billing = self
            .billing
            .get_by_user(principal.user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.portal
            .create_portal_session(&billing.stripe_customer_id, return_url)
            .await
    }

    fn breakdown(&self, period: BillingPeriod, usage: UsageTotals) -> PeriodBreakdown {
        PeriodBreakdown {
            period,
            usage,
            bill: self.pricing.bill(usage.order_count),
        }
    }
}
