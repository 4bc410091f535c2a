use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_state::AppState,
        response::{created, ok},
    },
    app_error::AppResult,
    application::use_cases::{notification::NotificationProfile, user::Principal},
    domain::entities::notification::NotificationKind,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_unread).post(create_notification))
        .route("/{id}/read", put(mark_read))
}

#[derive(Serialize)]
struct NotificationResponse {
    id: Uuid,
    recipient: String,
    message: String,
    kind: &'static str,
    read: bool,
    #[serde(skip_serializing_if = "Value::is_null")]
    metadata: Value,
    created_at: DateTime<Utc>,
}

impl From<NotificationProfile> for NotificationResponse {
    fn from(n: NotificationProfile) -> Self {
        Self {
            id: n.id,
            recipient: n.recipient.to_db_value(),
            message: n.message,
            kind: n.kind.as_str(),
            read: n.read,
            metadata: n.metadata,
            created_at: n.created_at,
        }
    }
}

async fn list_unread(
    State(app_state): State<AppState>,
    principal: Principal,
) -> AppResult<impl IntoResponse> {
    let notifications = app_state
        .notification_use_cases
        .list_unread(&principal)
        .await?;
    Ok(ok(notifications
        .into_iter()
        .map(NotificationResponse::from)
        .collect::<Vec<_>>()))
}

#[derive(Deserialize)]
struct CreateNotificationPayload {
    message: String,
    #[serde(default)]
    kind: Option<String>,
}

async fn create_notification(
    State(app_state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateNotificationPayload>,
) -> AppResult<impl IntoResponse> {
    let notification = app_state
        .notification_use_cases
        .create_for_self(
            &principal,
            &payload.message,
            payload.kind.as_deref().map(NotificationKind::from_str),
        )
        .await?;
    Ok(created(NotificationResponse::from(notification)))
}

#[derive(Serialize)]
struct ReadResponse {
    id: Uuid,
    read: bool,
}

async fn mark_read(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    app_state
        .notification_use_cases
        .mark_read(&principal, id)
        .await?;
    Ok(ok(ReadResponse { id, read: true }))
}
