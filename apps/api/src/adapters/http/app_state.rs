use std::sync::Arc;

use crate::{
    application::use_cases::{
        billing::BillingUseCases, failure_notifier::FailureNotifier,
        notification::NotificationUseCases, order_ledger::OrderLedger,
        order_webhook::OrderWebhookUseCases, payment_webhook::PaymentWebhookUseCases,
        site::SiteUseCases, user::UserUseCases,
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub user_use_cases: Arc<UserUseCases>,
    pub site_use_cases: Arc<SiteUseCases>,
    pub billing_use_cases: Arc<BillingUseCases>,
    pub notification_use_cases: Arc<NotificationUseCases>,
    pub order_webhook_use_cases: Arc<OrderWebhookUseCases>,
    pub payment_webhook_use_cases: Arc<PaymentWebhookUseCases>,
    pub order_ledger: Arc<OrderLedger>,
    pub failure_notifier: Arc<FailureNotifier>,
}
