use sqlx::PgPool;

use crate::app_error::AppError;

pub mod billing;
pub mod notification;
pub mod order;
pub mod site;
pub mod user;

const MAX_LOGGED_JSON_CHARS: usize = 200;

/// Decode a JSONB column into `T`, or `T::default()` for SQL NULL.
///
/// A value that no longer matches `T` is logged and decodes to the default.
pub fn decode_jsonb<T: serde::de::DeserializeOwned + Default>(
    value: serde_json::Value,
    table: &str,
    column: &str,
    row_id: &str,
) -> T {
    if value.is_null() {
        return T::default();
    }

    let logged = value.to_string();
    serde_json::from_value(value).unwrap_or_else(|err| {
        let logged: String = logged.chars().take(MAX_LOGGED_JSON_CHARS).collect();
        tracing::warn!(table, column, row_id, raw_json = %logged, error = %err, "Undecodable JSONB, using default");
        T::default()
    })
}

/// Implements every repository port on one pool.
#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::InvalidInput("A record with this value already exists".into())
            }
            sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
                AppError::InvalidInput("Referenced record not found".into())
            }
            _ => {
                // The raw error can contain query text; it is logged, never returned.
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::order::LineItem;

    #[test]
    fn line_items_decode_from_jsonb() {
        let json = serde_json::json!([
            { "product_id": "42", "name": "Mug", "quantity": 2, "unit_price_cents": 1250 }
        ]);
        let items: Vec<LineItem> = decode_jsonb(json, "orders", "line_items", "1");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price_cents, 1250);
    }

    #[test]
    fn sql_null_is_empty() {
        let items: Vec<LineItem> =
            decode_jsonb(serde_json::Value::Null, "orders", "line_items", "1");
        assert!(items.is_empty());
    }

    #[test]
    fn corrupt_json_falls_back_to_default() {
        let json = serde_json::json!({ "not": "a list" });
        let items: Vec<LineItem> = decode_jsonb(json, "orders", "line_items", "1");
        assert!(items.is_empty());
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(AppError::from(sqlx::Error::RowNotFound), AppError::NotFound));
    }

    #[test]
    fn other_errors_hide_details() {
        let err = AppError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::Database(ref msg) if msg == "Database operation failed"));
    }
}
