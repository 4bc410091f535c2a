use axum::{Router, extract::State, response::IntoResponse, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    adapters::http::{app_state::AppState, response::ok},
    app_error::AppResult,
    application::use_cases::user::{Principal, UserProfile},
};

pub fn router() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[derive(Serialize)]
pub(super) struct UserResponse {
    id: Uuid,
    email: String,
    name: Option<String>,
    role: &'static str,
    has_billing_customer: bool,
    created_at: DateTime<Utc>,
}

impl From<UserProfile> for UserResponse {
    fn from(user: UserProfile) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role.as_str(),
            has_billing_customer: user.stripe_customer_id.is_some(),
            created_at: user.created_at,
        }
    }
}

async fn get_me(
    State(app_state): State<AppState>,
    principal: Principal,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .user_use_cases
        .get_user(&principal, principal.user_id)
        .await?;
    Ok(ok(UserResponse::from(user)))
}
