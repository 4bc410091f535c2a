pub mod billing;
pub mod failure_notifier;
pub mod notification;
pub mod order_ledger;
pub mod order_webhook;
pub mod payment_webhook;
pub mod site;
pub mod site_resolver;
pub mod user;
