use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::site::{NewSite, SiteCredentials, SiteProfile, SiteRepoTrait},
    domain::entities::site::SiteStatus,
};

pub(crate) const SITE_COLUMNS: &str = "id, user_id, domain, name, product_type, status, \
     order_count, revenue_cents, currency, admin_url, consumer_key, consumer_secret, \
     provisioning_task_id, last_order_at, last_sync_at, created_at, updated_at";

pub(crate) fn row_to_profile(row: sqlx::postgres::PgRow) -> SiteProfile {
    SiteProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        domain: row.get("domain"),
        name: row.get("name"),
        product_type: row.get("product_type"),
        status: SiteStatus::from_str(row.get("status")),
        order_count: row.get("order_count"),
        revenue_cents: row.get("revenue_cents"),
        currency: row.get("currency"),
        admin_url: row.get("admin_url"),
        consumer_key: row.get("consumer_key"),
        consumer_secret: row.get("consumer_secret"),
        provisioning_task_id: row.get("provisioning_task_id"),
        last_order_at: row.get("last_order_at"),
        last_sync_at: row.get("last_sync_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl SiteRepoTrait for PostgresPersistence {
    async fn create(&self, site: &NewSite) -> AppResult<SiteProfile> {
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO sites (id, user_id, domain, name, product_type, status)
                VALUES ($1, $2, $3, $4, $5, 'creating')
                RETURNING {SITE_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(site.user_id)
        .bind(&site.domain)
        .bind(&site.name)
        .bind(&site.product_type)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::InvalidInput(_) => AppError::InvalidInput("Domain is already in use".into()),
            other => other,
        })?;
        Ok(row_to_profile(row))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SiteProfile>> {
        let row = sqlx::query(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn get_by_domain(&self, domain: &str) -> AppResult<Option<SiteProfile>> {
        let row = sqlx::query(&format!("SELECT {SITE_COLUMNS} FROM sites WHERE domain = $1"))
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn get_by_task_id(&self, task_id: &str) -> AppResult<Option<SiteProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE provisioning_task_id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SiteProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {SITE_COLUMNS} FROM sites WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn list_all(&self) -> AppResult<Vec<SiteProfile>> {
        let rows = sqlx::query(&format!(
            "SELECT {SITE_COLUMNS} FROM sites ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(row_to_profile).collect())
    }

    async fn set_pending_task(&self, id: Uuid, task_id: &str) -> AppResult<SiteProfile> {
        let row = sqlx::query(&format!(
            r#"
                UPDATE sites SET provisioning_task_id = $2, updated_at = now()
                WHERE id = $1
                RETURNING {SITE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_profile).ok_or(AppError::NotFound)
    }

    async fn activate(&self, id: Uuid, credentials: &SiteCredentials) -> AppResult<SiteProfile> {
        let row = sqlx::query(&format!(
            r#"
                UPDATE sites
                SET status = 'active',
                    consumer_key = $2,
                    consumer_secret = $3,
                    admin_url = COALESCE($4, admin_url),
                    provisioning_task_id = NULL,
                    last_sync_at = now(),
                    updated_at = now()
                WHERE id = $1
                RETURNING {SITE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&credentials.consumer_key)
        .bind(&credentials.consumer_secret)
        .bind(&credentials.admin_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_profile).ok_or(AppError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM sites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
