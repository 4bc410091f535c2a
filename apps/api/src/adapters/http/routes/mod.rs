pub mod admin;
pub mod billing;
pub mod notifications;
pub mod sites;
pub mod users;
pub mod webhooks;

use std::time::Duration;

use axum::{BoxError, Router, error_handling::HandleErrorLayer};
use tower::{ServiceBuilder, timeout::TimeoutLayer};

use crate::{adapters::http::app_state::AppState, app_error::AppError};

/// Webhook routes get their own short timeout; provisioning calls under
/// `/sites` can legitimately run for minutes.
pub fn router(webhook_timeout: Duration) -> Router<AppState> {
    Router::new()
        .nest("/webhooks", with_timeout(webhooks::router(), webhook_timeout))
        .nest("/sites", sites::router())
        .nest("/billing", billing::router())
        .nest("/notifications", notifications::router())
        .nest("/users", users::router())
        .nest("/admin", admin::router())
}

/// Timed-out requests answer with the usual error envelope.
fn with_timeout<S>(router: Router<S>, timeout: Duration) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(HandleErrorLayer::new(timeout_error))
            .layer(TimeoutLayer::new(timeout)),
    )
}

async fn timeout_error(err: BoxError) -> AppError {
    if err.is::<tower::timeout::error::Elapsed>() {
        AppError::Timeout
    } else {
        AppError::Internal(err.to_string())
    }
}
