use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::{
        BillingProfile, BillingRepoTrait, NewPayment, PaymentRecord, SubscriptionLink,
        UsageSnapshot,
    },
    domain::entities::billing::{PaymentStatus, SubscriptionStatus},
};

const BILLING_COLUMNS: &str = "user_id, stripe_customer_id, stripe_subscription_id, \
     stripe_subscription_item_id, subscription_status, current_period_start, current_period_end, \
     usage_order_count, usage_revenue_cents, usage_base_cents, usage_fee_cents, usage_total_cents, \
     usage_refreshed_at, invoice_email, invoice_business_name, invoice_vat_number, \
     created_at, updated_at";

fn row_to_profile(row: sqlx::postgres::PgRow) -> BillingProfile {
    BillingProfile {
        user_id: row.get("user_id"),
        stripe_customer_id: row.get("stripe_customer_id"),
        stripe_subscription_id: row.get("stripe_subscription_id"),
        stripe_subscription_item_id: row.get("stripe_subscription_item_id"),
        subscription_status: SubscriptionStatus::from_str(row.get("subscription_status")),
        current_period_start: row.get("current_period_start"),
        current_period_end: row.get("current_period_end"),
        usage: UsageSnapshot {
            order_count: row.get("usage_order_count"),
            revenue_cents: row.get("usage_revenue_cents"),
            base_cents: row.get("usage_base_cents"),
            fee_cents: row.get("usage_fee_cents"),
            total_cents: row.get("usage_total_cents"),
            refreshed_at: row.get("usage_refreshed_at"),
        },
        invoice_email: row.get("invoice_email"),
        invoice_business_name: row.get("invoice_business_name"),
        invoice_vat_number: row.get("invoice_vat_number"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_payment(row: sqlx::postgres::PgRow) -> PaymentRecord {
    PaymentRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: PaymentStatus::from_str(row.get("status")),
        processor_reference: row.get("processor_reference"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
    }
}

impl PostgresPersistence {
    async fn billing_where(&self, column: &str, value: &str) -> AppResult<Option<BillingProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {BILLING_COLUMNS} FROM billing WHERE {column} = $1 LIMIT 1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }
}

#[async_trait]
impl BillingRepoTrait for PostgresPersistence {
    async fn get_by_user(&self, user_id: Uuid) -> AppResult<Option<BillingProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {BILLING_COLUMNS} FROM billing WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn get_by_customer_id(&self, customer_id: &str) -> AppResult<Option<BillingProfile>> {
        self.billing_where("stripe_customer_id", customer_id).await
    }

    async fn get_by_subscription_id(
        &self,
        subscription_id: &str,
    ) -> AppResult<Option<BillingProfile>> {
        self.billing_where("stripe_subscription_id", subscription_id)
            .await
    }

    async fn upsert_subscription(&self, link: &SubscriptionLink) -> AppResult<BillingProfile> {
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO billing (
                    user_id, stripe_customer_id, stripe_subscription_id,
                    stripe_subscription_item_id, subscription_status,
                    current_period_start, current_period_end, invoice_email
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (user_id) DO UPDATE SET
                    stripe_customer_id = EXCLUDED.stripe_customer_id,
                    stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                    stripe_subscription_item_id = EXCLUDED.stripe_subscription_item_id,
                    subscription_status = EXCLUDED.subscription_status,
                    current_period_start = EXCLUDED.current_period_start,
                    current_period_end = EXCLUDED.current_period_end,
                    invoice_email = EXCLUDED.invoice_email,
                    updated_at = now()
                RETURNING {BILLING_COLUMNS}
            "#
        ))
        .bind(link.user_id)
        .bind(&link.stripe_customer_id)
        .bind(&link.stripe_subscription_id)
        .bind(&link.stripe_subscription_item_id)
        .bind(link.status.as_str())
        .bind(link.period_start)
        .bind(link.period_end)
        .bind(&link.invoice_email)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn update_subscription_status(
        &self,
        user_id: Uuid,
        status: SubscriptionStatus,
        period_start: Option<DateTime<Utc>>,
        period_end: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
                UPDATE billing
                SET subscription_status = $2,
                    current_period_start = COALESCE($3, current_period_start),
                    current_period_end = COALESCE($4, current_period_end),
                    updated_at = now()
                WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(status.as_str())
        .bind(period_start)
        .bind(period_end)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn update_usage_snapshot(
        &self,
        user_id: Uuid,
        snapshot: &UsageSnapshot,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
                UPDATE billing
                SET usage_order_count = $2,
                    usage_revenue_cents = $3,
                    usage_base_cents = $4,
                    usage_fee_cents = $5,
                    usage_total_cents = $6,
                    usage_refreshed_at = $7,
                    updated_at = now()
                WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(snapshot.order_count)
        .bind(snapshot.revenue_cents)
        .bind(snapshot.base_cents)
        .bind(snapshot.fee_cents)
        .bind(snapshot.total_cents)
        .bind(snapshot.refreshed_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_payment(&self, payment: &NewPayment) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
                INSERT INTO billing_payments (
                    id, user_id, amount_cents, currency, status, processor_reference, paid_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (processor_reference, status) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(payment.user_id)
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.processor_reference)
        .bind(payment.paid_at)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_payments(&self, user_id: Uuid) -> AppResult<Vec<PaymentRecord>> {
        let rows = sqlx::query(
            r#"
                SELECT id, user_id, amount_cents, currency, status, processor_reference,
                       paid_at, created_at
                FROM billing_payments
                WHERE user_id = $1
                ORDER BY paid_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_payment).collect())
    }

    async fn is_event_processed(&self, event_id: &str) -> AppResult<bool> {
        let row = sqlx::query("SELECT 1 AS hit FROM payment_events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.is_some())
    }

    async fn mark_event_processed(&self, event_id: &str, event_type: &str) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO payment_events (event_id, event_type) VALUES ($1, $2) ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(event_id)
        .bind(event_type)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
