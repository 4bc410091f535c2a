pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod http_client;
pub mod provisioning_client;
pub mod setup;
pub mod stripe_client;
pub mod webhook_signature;
