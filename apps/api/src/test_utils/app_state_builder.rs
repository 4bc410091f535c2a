//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` wires every use case against in-memory mocks so
//! route tests can run without a database or network.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt::{self, IdentityClaims, RealmAccess},
        use_cases::{
            billing::{BillingProfile, BillingUseCases},
            failure_notifier::FailureNotifier,
            notification::NotificationUseCases,
            order_ledger::OrderLedger,
            order_webhook::OrderWebhookUseCases,
            payment_webhook::PaymentWebhookUseCases,
            site::{SiteProfile, SiteUseCases},
            site_resolver::SiteResolver,
            user::{UserProfile, UserUseCases},
        },
    },
    domain::entities::billing::BillingPricing,
    infra::{
        config::AppConfig,
        webhook_signature::{WebhookSignatureVerifier, sign_payload},
    },
    test_utils::{
        InMemoryBillingRepo, InMemoryCommerceStore, InMemoryNotificationRepo, InMemoryUserRepo,
        MockBillingPortal, MockSiteProvisioner,
    },
};

pub const TEST_WOOCOMMERCE_SECRET: &str = "wc_test_webhook_secret";
pub const TEST_STRIPE_WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const TEST_IDENTITY_SECRET: &str = "test_identity_secret";
pub const TEST_ISSUER: &str = "https://id.test/realms/woosell";

/// `X-WC-Webhook-Signature` value for `body` under the test secret.
pub fn sign_test_body(body: &[u8]) -> String {
    sign_payload(TEST_WOOCOMMERCE_SECRET, body)
}

/// Access token for an existing user, signed with the test identity secret.
pub fn test_token_for(user: &UserProfile) -> String {
    let claims = IdentityClaims {
        sub: user.subject.clone(),
        email: Some(user.email.clone()),
        name: user.name.clone(),
        preferred_username: None,
        realm_access: Some(RealmAccess {
            roles: vec![user.role.as_str().to_string()],
        }),
        iss: TEST_ISSUER.to_string(),
        exp: chrono::Utc::now().timestamp() + 3600,
        iat: None,
    };
    jwt::issue(&claims, &SecretString::new(TEST_IDENTITY_SECRET.into()))
        .expect("test token should encode")
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        database_max_connections: 1,
        bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
        cors_origin: HeaderValue::from_static("http://localhost:3000"),
        app_origin: Url::parse("http://localhost:3000").unwrap(),
        log_file: String::new(),
        woocommerce_webhook_secret: SecretString::new(TEST_WOOCOMMERCE_SECRET.into()),
        stripe_webhook_secret: SecretString::new(TEST_STRIPE_WEBHOOK_SECRET.into()),
        stripe_secret_key: SecretString::new("sk_test".into()),
        identity_jwt_secret: SecretString::new(TEST_IDENTITY_SECRET.into()),
        identity_issuer: TEST_ISSUER.to_string(),
        provisioning_url: Url::parse("http://provisioner.test").unwrap(),
        provisioning_key: "provisioning_key".to_string(),
        provisioning_secret: SecretString::new("provisioning_secret".into()),
        provisioning_timeout: Duration::from_secs(60),
        webhook_timeout: Duration::from_secs(10),
        pricing: BillingPricing::default(),
    }
}

// ============================================================================
// Webhook harness
// ============================================================================

/// Order webhook use cases with handles on the mocks behind them.
pub struct TestWebhookHarness {
    pub use_cases: OrderWebhookUseCases,
    pub store: Arc<InMemoryCommerceStore>,
    pub notifications: Arc<InMemoryNotificationRepo>,
    pub billing: Arc<InMemoryBillingRepo>,
}

impl TestWebhookHarness {
    pub fn new(sites: Vec<SiteProfile>) -> Self {
        let store = Arc::new(InMemoryCommerceStore::with_sites(sites));
        let notifications = Arc::new(InMemoryNotificationRepo::new());
        let billing = Arc::new(InMemoryBillingRepo::new());

        let billing_use_cases = Arc::new(BillingUseCases::new(
            billing.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MockBillingPortal),
            BillingPricing::default(),
        ));
        let use_cases = OrderWebhookUseCases::new(
            Arc::new(WebhookSignatureVerifier::new(SecretString::new(
                TEST_WOOCOMMERCE_SECRET.into(),
            ))),
            SiteResolver::new(store.clone()),
            OrderLedger::new(store.clone()),
            billing_use_cases,
            Arc::new(FailureNotifier::new(notifications.clone())),
        );

        Self {
            use_cases,
            store,
            notifications,
            billing,
        }
    }
}

// ============================================================================
// TestAppStateBuilder
// ============================================================================

/// Handles on the mocks behind a built `AppState`, for assertions.
pub struct TestMocks {
    pub store: Arc<InMemoryCommerceStore>,
    pub users: Arc<InMemoryUserRepo>,
    pub notifications: Arc<InMemoryNotificationRepo>,
    pub billing: Arc<InMemoryBillingRepo>,
    pub provisioner: Arc<MockSiteProvisioner>,
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let user = create_test_user(|_| {});
/// let site = create_test_site(|s| s.user_id = user.id);
///
/// let app_state = TestAppStateBuilder::new()
///     .with_user(user)
///     .with_site(site)
///     .build();
/// ```
pub struct TestAppStateBuilder {
    sites: Vec<SiteProfile>,
    users: Vec<UserProfile>,
    billing: Vec<BillingProfile>,
    provisioner: Option<Arc<MockSiteProvisioner>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            sites: vec![],
            users: vec![],
            billing: vec![],
            provisioner: None,
        }
    }

    pub fn with_site(mut self, site: SiteProfile) -> Self {
        self.sites.push(site);
        self
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_billing(mut self, billing: BillingProfile) -> Self {
        self.billing.push(billing);
        self
    }

    /// Defaults to a provisioner that queues every request as `task-1`.
    pub fn with_provisioner(mut self, provisioner: Arc<MockSiteProvisioner>) -> Self {
        self.provisioner = Some(provisioner);
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_mocks().0
    }

    pub fn build_with_mocks(self) -> (AppState, TestMocks) {
        let config = Arc::new(test_config());

        let store = Arc::new(InMemoryCommerceStore::with_sites(self.sites));
        let users = Arc::new(InMemoryUserRepo::with_users(self.users));
        let notifications = Arc::new(InMemoryNotificationRepo::new());
        let billing = Arc::new(InMemoryBillingRepo::new());
        for record in self.billing {
            billing.insert(record);
        }
        let provisioner = self
            .provisioner
            .unwrap_or_else(|| Arc::new(MockSiteProvisioner::pending("task-1")));

        let failure_notifier = Arc::new(FailureNotifier::new(notifications.clone()));
        let order_ledger = Arc::new(OrderLedger::new(store.clone()));

        let billing_use_cases = Arc::new(BillingUseCases::new(
            billing.clone(),
            store.clone(),
            store.clone(),
            Arc::new(MockBillingPortal),
            config.pricing,
        ));

        let order_webhook_use_cases = Arc::new(OrderWebhookUseCases::new(
            Arc::new(WebhookSignatureVerifier::new(SecretString::new(
                TEST_WOOCOMMERCE_SECRET.into(),
            ))),
            SiteResolver::new(store.clone()),
            OrderLedger::new(store.clone()),
            billing_use_cases.clone(),
            failure_notifier.clone(),
        ));

        let app_state = AppState {
            config,
            user_use_cases: Arc::new(UserUseCases::new(users.clone())),
            site_use_cases: Arc::new(SiteUseCases::new(store.clone(), provisioner.clone())),
            billing_use_cases,
            notification_use_cases: Arc::new(NotificationUseCases::new(notifications.clone())),
            order_webhook_use_cases,
            payment_webhook_use_cases: Arc::new(PaymentWebhookUseCases::new(
                billing.clone(),
                users.clone(),
            )),
            order_ledger,
            failure_notifier,
        };

        let mocks = TestMocks {
            store,
            users,
            notifications,
            billing,
            provisioner,
        };
        (app_state, mocks)
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
