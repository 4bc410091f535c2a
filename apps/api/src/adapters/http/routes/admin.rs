use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{delete, post, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use woosell_types::money::format_minor_units;

use crate::{
    adapters::http::{app_state::AppState, response::ok},
    app_error::{AppError, AppResult},
    application::use_cases::user::Principal,
    domain::entities::user::Role,
};

use super::users::UserResponse;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", delete(clear_notifications))
        .route("/sites/{id}/reconcile", post(reconcile_site))
        .route("/users/{id}/role", put(set_user_role))
}

#[derive(Serialize)]
struct ClearedResponse {
    deleted: u64,
}

async fn clear_notifications(
    State(app_state): State<AppState>,
    principal: Principal,
) -> AppResult<impl IntoResponse> {
    let deleted = app_state
        .notification_use_cases
        .clear_all(&principal)
        .await?;
    Ok(ok(ClearedResponse { deleted }))
}

#[derive(Serialize)]
struct ReconcileResponse {
    site_id: Uuid,
    order_count: i64,
    revenue_cents: i64,
    revenue: String,
    last_order_at: Option<DateTime<Utc>>,
}

async fn reconcile_site(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(site_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    principal.require(Role::Admin)?;
    let site = app_state.site_use_cases.get_site(&principal, site_id).await?;

    let counters = app_state.order_ledger.reconcile_site(site.id).await?;
    Ok(ok(ReconcileResponse {
        site_id: site.id,
        order_count: counters.order_count,
        revenue_cents: counters.revenue_cents,
        revenue: format_minor_units(counters.revenue_cents),
        last_order_at: counters.last_order_at,
    }))
}

#[derive(Deserialize)]
struct SetRolePayload {
    role: String,
}

async fn set_user_role(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<SetRolePayload>,
) -> AppResult<impl IntoResponse> {
    let role = Role::parse(&payload.role)
        .ok_or_else(|| AppError::InvalidInput(format!("Unknown role `{}`", payload.role)))?;

    let user = app_state
        .user_use_cases
        .set_role(&principal, user_id, role)
        .await?;
    Ok(ok(UserResponse::from(user)))
}
