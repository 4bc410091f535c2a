use std::net::SocketAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use env_helpers::get_env_default;
use secrecy::SecretString;
use url::Url;

use crate::domain::entities::billing::BillingPricing;
use crate::infra::error::InfraError;

pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
    /// Where the dashboard lives; used as the billing portal return target.
    pub app_origin: Url,
    pub log_file: String,
    /// Shared secret of the storefront order webhooks.
    pub woocommerce_webhook_secret: SecretString,
    pub stripe_webhook_secret: SecretString,
    pub stripe_secret_key: SecretString,
    pub identity_jwt_secret: SecretString,
    pub identity_issuer: String,
    pub provisioning_url: Url,
    pub provisioning_key: String,
    pub provisioning_secret: SecretString,
    pub provisioning_timeout: Duration,
    pub webhook_timeout: Duration,
    pub pricing: BillingPricing,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, InfraError> {
        let database_url = required("DATABASE_URL")?;
        let database_max_connections: u32 = get_env_default("DATABASE_MAX_CONNECTIONS", 5);
        let bind_addr: SocketAddr = get_env_default(
            "BIND_ADDR",
            SocketAddr::from(([127, 0, 0, 1], 3001)),
        );
        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .map_err(|_| InfraError::ConfigInvalid { var: "CORS_ORIGIN" })?;
        let app_origin = required_url("APP_ORIGIN")?;
        let log_file: String = get_env_default("LOG_FILE", String::from("app.log"));

        let woocommerce_webhook_secret = required_secret("WOOCOMMERCE_WEBHOOK_SECRET")?;
        let stripe_webhook_secret = required_secret("STRIPE_WEBHOOK_SECRET")?;
        let stripe_secret_key = required_secret("STRIPE_SECRET_KEY")?;
        let identity_jwt_secret = required_secret("IDENTITY_JWT_SECRET")?;
        let identity_issuer = required("IDENTITY_ISSUER")?;

        let provisioning_url = required_url("PROVISIONING_URL")?;
        let provisioning_key = required("PROVISIONING_KEY")?;
        let provisioning_secret = required_secret("PROVISIONING_SECRET")?;
        let provisioning_timeout_secs: u64 = get_env_default("PROVISIONING_TIMEOUT_SECS", 1800);
        let webhook_timeout_secs: u64 = get_env_default("WEBHOOK_TIMEOUT_SECS", 10);

        let pricing = BillingPricing {
            base_fee_cents: get_env_default("BILLING_BASE_FEE_CENTS", 100),
            per_order_fee_cents: get_env_default("BILLING_PER_ORDER_FEE_CENTS", 50),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            bind_addr,
            cors_origin,
            app_origin,
            log_file,
            woocommerce_webhook_secret,
            stripe_webhook_secret,
            stripe_secret_key,
            identity_jwt_secret,
            identity_issuer,
            provisioning_url,
            provisioning_key,
            provisioning_secret,
            provisioning_timeout: Duration::from_secs(provisioning_timeout_secs),
            webhook_timeout: Duration::from_secs(webhook_timeout_secs),
            pricing,
        })
    }
}

/// A blank value counts as missing.
fn required(var: &'static str) -> Result<String, InfraError> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or(InfraError::ConfigMissing { var })
}

fn required_secret(var: &'static str) -> Result<SecretString, InfraError> {
    required(var).map(|v| SecretString::new(v.into()))
}

fn required_url(var: &'static str) -> Result<Url, InfraError> {
    required(var)?
        .parse()
        .map_err(|_| InfraError::ConfigInvalid { var })
}
