//! Administrative alerts for webhook failures.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::app_error::AppError;
use crate::application::helpers::order_payload::ParseError;
use crate::application::use_cases::notification::{NewNotification, NotificationRepoTrait};
use crate::domain::entities::notification::{NotificationKind, Recipient};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidSignature,
    MalformedPayload,
    SiteNotFound,
    ProcessingFailure,
    PaymentWebhookFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::InvalidSignature => "InvalidSignature",
            FailureKind::MalformedPayload => "MalformedPayload",
            FailureKind::SiteNotFound => "SiteNotFound",
            FailureKind::ProcessingFailure => "ProcessingFailure",
            FailureKind::PaymentWebhookFailure => "PaymentWebhookFailure",
        }
    }

    fn notification_kind(&self) -> NotificationKind {
        match self {
            FailureKind::InvalidSignature | FailureKind::MalformedPayload => {
                NotificationKind::Warning
            }
            _ => NotificationKind::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailureContext {
    pub kind: FailureKind,
    pub message: String,
    pub details: Value,
}

impl FailureContext {
    pub fn invalid_signature(source: Option<&str>) -> Self {
        Self {
            kind: FailureKind::InvalidSignature,
            message: format!(
                "Webhook error: invalid signature ({})",
                source.unwrap_or("unknown source")
            ),
            details: json!({ "source": source }),
        }
    }

    pub fn malformed_payload(err: &ParseError, source: Option<&str>) -> Self {
        Self {
            kind: FailureKind::MalformedPayload,
            message: format!("Webhook error: malformed payload ({err})"),
            details: json!({ "field": err.field(), "source": source }),
        }
    }

    pub fn site_not_found(site_ref: &str) -> Self {
        Self {
            kind: FailureKind::SiteNotFound,
            message: format!("Webhook error: site not found ({site_ref})"),
            details: json!({ "site_ref": site_ref, "reason": "SiteNotFound" }),
        }
    }

    pub fn processing_failure(err: &AppError, upstream_order_id: Option<&str>) -> Self {
        Self {
            kind: FailureKind::ProcessingFailure,
            message: format!("Webhook error: processing failed ({err})"),
            details: json!({ "upstream_order_id": upstream_order_id }),
        }
    }

    pub fn payment_webhook_failure(err: &AppError, event_type: &str, event_id: &str) -> Self {
        Self {
            kind: FailureKind::PaymentWebhookFailure,
            message: format!("Payment webhook error: {event_type} ({err})"),
            details: json!({ "event_type": event_type, "event_id": event_id }),
        }
    }
}

/// Records failures as notifications for the administrative recipient.
///
/// Never fails: a notification that cannot be stored is logged and dropped.
#[derive(Clone)]
pub struct FailureNotifier {
    repo: Arc<dyn NotificationRepoTrait>,
}

impl FailureNotifier {
    pub fn new(repo: Arc<dyn NotificationRepoTrait>) -> Self {
        Self { repo }
    }

    pub async fn notify(&self, context: FailureContext) {
        let kind = context.kind.notification_kind();
        match kind {
            NotificationKind::Error => tracing::error!(
                failure = context.kind.as_str(),
                details = %context.details,
                "{}",
                context.message
            ),
            _ => tracing::warn!(
                failure = context.kind.as_str(),
                details = %context.details,
                "{}",
                context.message
            ),
        }

        let mut metadata = context.details;
        if let Value::Object(map) = &mut metadata {
            map.insert("failure".into(), Value::String(context.kind.as_str().into()));
        }

        let notification = NewNotification {
            recipient: Recipient::Admins,
            message: context.message,
            kind,
            metadata,
        };

        if let Err(e) = self.repo.create(&notification).await {
            tracing::error!(error = %e, "Failed to store failure notification");
        }
    }
}
