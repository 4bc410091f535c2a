use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use woosell_types::money::format_minor_units;

use crate::{
    adapters::http::{
        app_state::AppState,
        response::{created, ok},
    },
    app_error::AppResult,
    application::use_cases::{
        site::{CreateSiteInput, SiteProfile},
        user::Principal,
    },
};

use super::billing::get_site_billing;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sites).post(create_site))
        .route("/status", get(get_provisioning_status))
        .route("/{id}", get(get_site).delete(delete_site))
        .route("/{id}/billing", get(get_site_billing))
}

/// Public view of a site. The consumer secret never leaves the server.
#[derive(Serialize)]
struct SiteResponse {
    id: Uuid,
    user_id: Uuid,
    domain: String,
    name: String,
    product_type: String,
    status: &'static str,
    order_count: i64,
    revenue_cents: i64,
    revenue: String,
    currency: String,
    admin_url: Option<String>,
    consumer_key: Option<String>,
    has_credentials: bool,
    provisioning_task_id: Option<String>,
    last_order_at: Option<DateTime<Utc>>,
    last_sync_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<SiteProfile> for SiteResponse {
    fn from(site: SiteProfile) -> Self {
        Self {
            id: site.id,
            user_id: site.user_id,
            has_credentials: site.consumer_key.is_some() && site.consumer_secret.is_some(),
            domain: site.domain,
            name: site.name,
            product_type: site.product_type,
            status: site.status.as_str(),
            order_count: site.order_count,
            revenue_cents: site.revenue_cents,
            revenue: format_minor_units(site.revenue_cents),
            currency: site.currency,
            admin_url: site.admin_url,
            consumer_key: site.consumer_key,
            provisioning_task_id: site.provisioning_task_id,
            last_order_at: site.last_order_at,
            last_sync_at: site.last_sync_at,
            created_at: site.created_at,
        }
    }
}

#[derive(Deserialize)]
struct CreateSitePayload {
    domain: String,
    name: String,
    password: String,
    #[serde(default, alias = "productType")]
    product_type: Option<String>,
}

async fn create_site(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateSitePayload>,
) -> AppResult<impl IntoResponse> {
    let site = app_state
        .site_use_cases
        .create_site(
            &principal,
            CreateSiteInput {
                domain: payload.domain,
                name: payload.name,
                password: SecretString::new(payload.password.into_boxed_str()),
                product_type: payload.product_type,
            },
        )
        .await?;

    Ok(created(SiteResponse::from(site)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusQuery {
    task_id: String,
}

async fn get_provisioning_status(
    State(app_state): State<AppState>,
    principal: Principal,
    Query(query): Query<StatusQuery>,
) -> AppResult<impl IntoResponse> {
    let site = app_state
        .site_use_cases
        .provisioning_status(&principal, &query.task_id)
        .await?;
    Ok(ok(SiteResponse::from(site)))
}

async fn list_sites(
    State(app_state): State<AppState>,
    principal: Principal,
) -> AppResult<impl IntoResponse> {
    let sites = app_state.site_use_cases.list_sites(&principal).await?;
    Ok(ok(sites.into_iter().map(SiteResponse::from).collect::<Vec<_>>()))
}

async fn get_site(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(site_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let site = app_state.site_use_cases.get_site(&principal, site_id).await?;
    Ok(ok(SiteResponse::from(site)))
}

#[derive(Serialize)]
struct DeletedResponse {
    deleted: bool,
}

async fn delete_site(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(site_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    app_state
        .site_use_cases
        .delete_site(&principal, site_id)
        .await?;
    Ok(ok(DeletedResponse { deleted: true }))
}
