pub mod order_payload;
pub mod site_ref;
