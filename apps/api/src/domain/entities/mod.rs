pub mod billing;
pub mod billing_period;
pub mod notification;
pub mod order;
pub mod site;
pub mod user;
