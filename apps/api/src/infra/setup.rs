use std::fs::File;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{http::app_state::AppState, persistence::PostgresPersistence},
    application::use_cases::{
        billing::{BillingRepoTrait, BillingUseCases},
        failure_notifier::FailureNotifier,
        notification::{NotificationRepoTrait, NotificationUseCases},
        order_ledger::{OrderLedger, OrderRepoTrait},
        order_webhook::OrderWebhookUseCases,
        payment_webhook::PaymentWebhookUseCases,
        site::{SiteRepoTrait, SiteUseCases},
        site_resolver::SiteResolver,
        user::{UserRepoTrait, UserUseCases},
    },
    infra::{
        config::AppConfig,
        error::InfraError,
        http_client::{build_client, build_client_with_timeout},
        provisioning_client::ProvisioningClient,
        stripe_client::StripeClient,
        webhook_signature::WebhookSignatureVerifier,
    },
};

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().into())
}

/// Wire repositories, outbound clients and use cases around one pool.
pub fn build_app_state(config: AppConfig, pool: PgPool) -> Result<AppState, InfraError> {
    let postgres = Arc::new(PostgresPersistence::new(pool));
    let users = postgres.clone() as Arc<dyn UserRepoTrait>;
    let sites = postgres.clone() as Arc<dyn SiteRepoTrait>;
    let orders = postgres.clone() as Arc<dyn OrderRepoTrait>;
    let billing = postgres.clone() as Arc<dyn BillingRepoTrait>;
    let notifications = postgres as Arc<dyn NotificationRepoTrait>;

    let stripe = Arc::new(StripeClient::new(
        build_client()?,
        copy_secret(&config.stripe_secret_key),
    ));
    let provisioner = Arc::new(ProvisioningClient::new(
        build_client_with_timeout(config.provisioning_timeout)?,
        config.provisioning_url.clone(),
        config.provisioning_key.clone(),
        copy_secret(&config.provisioning_secret),
    ));
    let verifier = Arc::new(WebhookSignatureVerifier::new(copy_secret(
        &config.woocommerce_webhook_secret,
    )));

    let failure_notifier = Arc::new(FailureNotifier::new(notifications.clone()));
    let order_ledger = OrderLedger::new(orders.clone());

    let billing_use_cases = Arc::new(BillingUseCases::new(
        billing.clone(),
        orders,
        sites.clone(),
        stripe,
        config.pricing,
    ));

    let order_webhook_use_cases = OrderWebhookUseCases::new(
        verifier,
        SiteResolver::new(sites.clone()),
        order_ledger.clone(),
        billing_use_cases.clone(),
        failure_notifier.clone(),
    );

    Ok(AppState {
        config: Arc::new(config),
        user_use_cases: Arc::new(UserUseCases::new(users.clone())),
        site_use_cases: Arc::new(SiteUseCases::new(sites, provisioner)),
        billing_use_cases,
        notification_use_cases: Arc::new(NotificationUseCases::new(notifications)),
        order_webhook_use_cases: Arc::new(order_webhook_use_cases),
        payment_webhook_use_cases: Arc::new(PaymentWebhookUseCases::new(billing, users)),
        order_ledger: Arc::new(order_ledger),
        failure_notifier,
    })
}

/// Pretty console output plus JSON lines in `log_file`.
///
/// The file layer is skipped when the file cannot be created.
pub fn init_tracing(log_file: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "woosell_api=debug,tower_http=debug".into());

    let console_layer = fmt::layer().with_target(false).with_level(true).pretty();

    let (json_layer, file_error) = match File::create(log_file) {
        Ok(file) => (
            Some(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_current_span(true)
                    .with_span_list(true),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();

    if let Some(e) = file_error {
        tracing::warn!(log_file, error = %e, "Cannot create log file, logging to console only");
    }
}
