use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use woosell_types::money::format_minor_units;

use crate::{
    adapters::http::{app_state::AppState, response::ok},
    app_error::{AppError, AppResult},
    application::use_cases::{
        billing::{BillingProfile, PaymentRecord, PeriodBreakdown},
        user::Principal,
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_overview))
        .route("/portal", post(create_portal_session))
}

// ============================================================================
// Response bodies
// ============================================================================

#[derive(Serialize)]
struct PeriodResponse {
    label: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    order_count: i64,
    revenue_cents: i64,
    revenue: String,
    base_fee: String,
    usage_fee: String,
    total: String,
    total_cents: i64,
}

impl From<&PeriodBreakdown> for PeriodResponse {
    fn from(b: &PeriodBreakdown) -> Self {
        let summary = b.period.summary();
        Self {
            label: summary.label,
            start: summary.start,
            end: summary.end,
            order_count: b.usage.order_count,
            revenue_cents: b.usage.revenue_cents,
            revenue: format_minor_units(b.usage.revenue_cents),
            base_fee: format_minor_units(b.bill.base_cents),
            usage_fee: format_minor_units(b.bill.usage_cents),
            total: format_minor_units(b.bill.total_cents),
            total_cents: b.bill.total_cents,
        }
    }
}

#[derive(Serialize)]
struct SubscriptionResponse {
    status: &'static str,
    stripe_customer_id: String,
    stripe_subscription_id: Option<String>,
    current_period_start: Option<DateTime<Utc>>,
    current_period_end: Option<DateTime<Utc>>,
    invoice_email: String,
    usage_refreshed_at: Option<DateTime<Utc>>,
}

impl From<BillingProfile> for SubscriptionResponse {
    fn from(b: BillingProfile) -> Self {
        Self {
            status: b.subscription_status.as_str(),
            stripe_customer_id: b.stripe_customer_id,
            stripe_subscription_id: b.stripe_subscription_id,
            current_period_start: b.current_period_start,
            current_period_end: b.current_period_end,
            invoice_email: b.invoice_email,
            usage_refreshed_at: b.usage.refreshed_at,
        }
    }
}

#[derive(Serialize)]
struct PaymentResponse {
    id: Uuid,
    amount: String,
    amount_cents: i64,
    currency: String,
    status: &'static str,
    paid_at: DateTime<Utc>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(p: PaymentRecord) -> Self {
        Self {
            id: p.id,
            amount: format_minor_units(p.amount_cents),
            amount_cents: p.amount_cents,
            currency: p.currency,
            status: p.status.as_str(),
            paid_at: p.paid_at,
        }
    }
}

#[derive(Serialize)]
struct OverviewResponse {
    user_id: Uuid,
    current_month: PeriodResponse,
    previous_month: PeriodResponse,
    subscription: Option<SubscriptionResponse>,
    payments: Vec<PaymentResponse>,
}

#[derive(Serialize)]
struct SiteBillingResponse {
    site_id: Uuid,
    domain: String,
    current_month: PeriodResponse,
    previous_month: PeriodResponse,
}

#[derive(Serialize)]
struct PortalResponse {
    url: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_overview(
    State(app_state): State<AppState>,
    principal: Principal,
) -> AppResult<impl IntoResponse> {
    let overview = app_state
        .billing_use_cases
        .user_billing_overview(&principal, Utc::now())
        .await?;

    Ok(ok(OverviewResponse {
        user_id: overview.user_id,
        current_month: PeriodResponse::from(&overview.current_month),
        previous_month: PeriodResponse::from(&overview.previous_month),
        subscription: overview.subscription.map(SubscriptionResponse::from),
        payments: overview.payments.into_iter().map(PaymentResponse::from).collect(),
    }))
}

/// Mounted under `/sites/{id}/billing`.
pub(super) async fn get_site_billing(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(site_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let stats = app_state
        .billing_use_cases
        .site_billing_stats(&principal, site_id, Utc::now())
        .await?;

    Ok(ok(SiteBillingResponse {
        site_id: stats.site_id,
        domain: stats.domain,
        current_month: PeriodResponse::from(&stats.current_month),
        previous_month: PeriodResponse::from(&stats.previous_month),
    }))
}

async fn create_portal_session(
    State(app_state): State<AppState>,
    principal: Principal,
) -> AppResult<impl IntoResponse> {
    let return_url = app_state
        .config
        .app_origin
        .join("billing")
        .map_err(|e| AppError::Configuration(format!("Invalid APP_ORIGIN: {e}")))?;

    let url = app_state
        .billing_use_cases
        .portal_url(&principal, return_url.as_str())
        .await?;

    Ok(ok(PortalResponse { url }))
}
