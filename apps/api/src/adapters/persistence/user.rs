use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::user::{NewUser, UserProfile, UserRepoTrait},
    domain::entities::user::Role,
};

const USER_COLUMNS: &str =
    "id, subject, email, name, role, stripe_customer_id, created_at, updated_at";

fn row_to_profile(row: sqlx::postgres::PgRow) -> UserProfile {
    UserProfile {
        id: row.get("id"),
        subject: row.get("subject"),
        email: row.get("email"),
        name: row.get("name"),
        role: Role::from_str(row.get("role")),
        stripe_customer_id: row.get("stripe_customer_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl UserRepoTrait for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn get_by_subject(&self, subject: &str) -> AppResult<Option<UserProfile>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE subject = $1"))
            .bind(subject)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(row_to_profile))
    }

    async fn create(&self, user: &NewUser) -> AppResult<UserProfile> {
        // A concurrent first sign-in may have inserted the row already; the
        // stored role is kept in that case.
        let row = sqlx::query(&format!(
            r#"
                INSERT INTO users (id, subject, email, name, role)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (subject) DO UPDATE
                    SET email = EXCLUDED.email, updated_at = now()
                RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.subject)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(row))
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<UserProfile> {
        let row = sqlx::query(&format!(
            "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.map(row_to_profile).ok_or(AppError::NotFound)
    }

    async fn set_stripe_customer_id(&self, id: Uuid, customer_id: &str) -> AppResult<()> {
        sqlx::query("UPDATE users SET stripe_customer_id = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
