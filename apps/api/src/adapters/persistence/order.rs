use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, decode_jsonb},
    app_error::{AppError, AppResult},
    application::use_cases::order_ledger::{
        LedgerWrite, NewOrder, OrderProfile, OrderRepoTrait, SiteCounters, UsageTotals,
    },
    domain::entities::{
        billing_period::BillingPeriod,
        order::{LineItem, OrderStatus},
    },
};

const ORDER_COLUMNS: &str = "id, site_id, upstream_order_id, customer_ref, customer_email, \
     amount_cents, currency, status, line_items, billing_period_start, billing_period_end, \
     metadata, occurred_at, created_at";

fn row_to_profile(row: sqlx::postgres::PgRow) -> OrderProfile {
    let id: Uuid = row.get("id");
    let line_items: serde_json::Value = row.get("line_items");
    OrderProfile {
        id,
        site_id: row.get("site_id"),
        upstream_order_id: row.get("upstream_order_id"),
        customer_ref: row.get("customer_ref"),
        customer_email: row.get("customer_email"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: OrderStatus::from_str(row.get("status")),
        line_items: decode_jsonb::<Vec<LineItem>>(
            line_items,
            "orders",
            "line_items",
            &id.to_string(),
        ),
        billing_period_start: row.get("billing_period_start"),
        billing_period_end: row.get("billing_period_end"),
        metadata: row.get("metadata"),
        occurred_at: row.get("occurred_at"),
        created_at: row.get("created_at"),
    }
}

fn row_to_usage(row: sqlx::postgres::PgRow) -> UsageTotals {
    UsageTotals {
        order_count: row.get("order_count"),
        revenue_cents: row.get("revenue_cents"),
    }
}

#[async_trait]
impl OrderRepoTrait for PostgresPersistence {
    async fn insert_completed_order(&self, order: &NewOrder) -> AppResult<LedgerWrite> {
        let line_items = serde_json::to_value(&order.line_items)
            .map_err(|e| AppError::Internal(format!("Failed to encode line items: {e}")))?;

        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let inserted = sqlx::query(&format!(
            r#"
                INSERT INTO orders (
                    id, site_id, upstream_order_id, customer_ref, customer_email,
                    amount_cents, currency, status, line_items,
                    billing_period_start, billing_period_end, metadata, occurred_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ON CONFLICT (site_id, upstream_order_id) DO NOTHING
                RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(order.site_id)
        .bind(&order.upstream_order_id)
        .bind(&order.customer_ref)
        .bind(&order.customer_email)
        .bind(order.amount_cents)
        .bind(&order.currency)
        .bind(order.status.as_str())
        .bind(line_items)
        .bind(order.period.start())
        .bind(order.period.last_instant())
        .bind(&order.metadata)
        .bind(order.occurred_at)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let Some(row) = inserted else {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(LedgerWrite::Duplicate);
        };

        // Counters move in the same transaction as the insert.
        let updated = sqlx::query(
            r#"
                UPDATE sites
                SET order_count = order_count + 1,
                    revenue_cents = revenue_cents + $2,
                    last_order_at = GREATEST(COALESCE(last_order_at, $3), $3),
                    updated_at = now()
                WHERE id = $1
            "#,
        )
        .bind(order.site_id)
        .bind(order.amount_cents)
        .bind(order.occurred_at)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        if updated.rows_affected() == 0 {
            tx.rollback().await.map_err(AppError::from)?;
            return Err(AppError::Database("Site row missing for order".into()));
        }

        tx.commit().await.map_err(AppError::from)?;
        Ok(LedgerWrite::Inserted(row_to_profile(row)))
    }

    async fn usage_for_site(&self, site_id: Uuid, period: BillingPeriod) -> AppResult<UsageTotals> {
        let row = sqlx::query(
            r#"
                SELECT COUNT(*)::BIGINT AS order_count,
                       COALESCE(SUM(amount_cents), 0)::BIGINT AS revenue_cents
                FROM orders
                WHERE site_id = $1 AND status = 'completed'
                  AND occurred_at >= $2 AND occurred_at < $3
            "#,
        )
        .bind(site_id)
        .bind(period.start())
        .bind(period.next_start())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_usage(row))
    }

    async fn usage_for_user(&self, user_id: Uuid, period: BillingPeriod) -> AppResult<UsageTotals> {
        let row = sqlx::query(
            r#"
                SELECT COUNT(o.id)::BIGINT AS order_count,
                       COALESCE(SUM(o.amount_cents), 0)::BIGINT AS revenue_cents
                FROM orders o
                JOIN sites s ON s.id = o.site_id
                WHERE s.user_id = $1 AND o.status = 'completed'
                  AND o.occurred_at >= $2 AND o.occurred_at < $3
            "#,
        )
        .bind(user_id)
        .bind(period.start())
        .bind(period.next_start())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_usage(row))
    }

    async fn recompute_site_counters(&self, site_id: Uuid) -> AppResult<SiteCounters> {
        let row = sqlx::query(
            r#"
                UPDATE sites s
                SET order_count = agg.order_count,
                    revenue_cents = agg.revenue_cents,
                    last_order_at = agg.last_order_at,
                    updated_at = now()
                FROM (
                    SELECT COUNT(*)::BIGINT AS order_count,
                           COALESCE(SUM(amount_cents), 0)::BIGINT AS revenue_cents,
                           MAX(occurred_at) AS last_order_at
                    FROM orders
                    WHERE site_id = $1 AND status = 'completed'
                ) agg
                WHERE s.id = $1
                RETURNING s.order_count, s.revenue_cents, s.last_order_at
            "#,
        )
        .bind(site_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?
        .ok_or(AppError::NotFound)?;

        Ok(SiteCounters {
            order_count: row.get("order_count"),
            revenue_cents: row.get("revenue_cents"),
            last_order_at: row.get("last_order_at"),
        })
    }
}
