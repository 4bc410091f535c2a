//! Test data factories for creating valid test fixtures.
//!
//! Each factory returns a complete object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    application::{
        helpers::order_payload::OrderEvent,
        use_cases::{
            billing::{BillingProfile, UsageSnapshot},
            site::SiteProfile,
            user::{Principal, UserProfile},
        },
    },
    domain::entities::{
        billing::SubscriptionStatus,
        order::{LineItem, OrderEventKind, OrderStatus},
        site::SiteStatus,
        user::Role,
    },
};

/// Fixed instant used as the default for timestamps.
pub fn test_datetime() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 10, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// Create a test user with sensible defaults.
pub fn create_test_user(overrides: impl FnOnce(&mut UserProfile)) -> UserProfile {
    let id = Uuid::new_v4();
    let mut user = UserProfile {
        id,
        subject: format!("subject-{id}"),
        email: format!("user-{}@example.com", &id.simple().to_string()[..8]),
        name: Some("Test User".to_string()),
        role: Role::User,
        stripe_customer_id: None,
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut user);
    user
}

/// Create a principal that does not need a stored user.
pub fn create_test_principal(role: Role) -> Principal {
    let user = create_test_user(|u| u.role = role);
    Principal::from(&user)
}

/// Create an active site with provisioned credentials.
pub fn create_test_site(overrides: impl FnOnce(&mut SiteProfile)) -> SiteProfile {
    let id = Uuid::new_v4();
    let mut site = SiteProfile {
        id,
        user_id: Uuid::new_v4(),
        domain: format!("shop-{}.example.com", &id.simple().to_string()[..8]),
        name: "Test Shop".to_string(),
        product_type: "woocommerce".to_string(),
        status: SiteStatus::Active,
        order_count: 0,
        revenue_cents: 0,
        currency: "EUR".to_string(),
        admin_url: Some("https://shop.example.com/wp-admin".to_string()),
        consumer_key: Some("ck_test".to_string()),
        consumer_secret: Some("cs_test".to_string()),
        provisioning_task_id: None,
        last_order_at: None,
        last_sync_at: None,
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut site);
    site
}

/// Create a completed order event for an unspecified site.
pub fn create_test_order_event(overrides: impl FnOnce(&mut OrderEvent)) -> OrderEvent {
    let mut event = OrderEvent {
        kind: OrderEventKind::Completed,
        upstream_order_id: "WC-1001".to_string(),
        site_ref: "shop.example.com".to_string(),
        amount_cents: 1999,
        currency: "EUR".to_string(),
        status: OrderStatus::Completed,
        line_items: vec![LineItem {
            product_id: Some("42".to_string()),
            name: "T-Shirt".to_string(),
            quantity: 1,
            unit_price_cents: 1999,
        }],
        customer_ref: Some("7".to_string()),
        customer_email: Some("buyer@example.com".to_string()),
        occurred_at: test_datetime(),
        metadata: json!({ "shape": "simplified", "topic": "order.completed" }),
    };
    overrides(&mut event);
    event
}

/// Create an active billing record for `user_id`.
pub fn create_test_billing(
    user_id: Uuid,
    overrides: impl FnOnce(&mut BillingProfile),
) -> BillingProfile {
    let mut billing = BillingProfile {
        user_id,
        stripe_customer_id: format!("cus_{}", &user_id.simple().to_string()[..8]),
        stripe_subscription_id: None,
        stripe_subscription_item_id: None,
        subscription_status: SubscriptionStatus::Active,
        current_period_start: Some(test_datetime()),
        current_period_end: Some(test_datetime() + chrono::Duration::days(30)),
        usage: UsageSnapshot::default(),
        invoice_email: "billing@example.com".to_string(),
        invoice_business_name: None,
        invoice_vat_number: None,
        created_at: test_datetime(),
        updated_at: test_datetime(),
    };
    overrides(&mut billing);
    billing
}
