//! HTTP client factory with consistent timeout configuration.
//!
//! Outbound clients (payment processor, provisioning service) are built
//! here rather than with `reqwest::Client::new()`.

use reqwest::Client;
use std::time::Duration;

use crate::infra::error::InfraError;

/// TCP handshake plus TLS.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Total request/response time for calls expected to finish in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a client with the default timeouts.
pub fn build_client() -> Result<Client, InfraError> {
    build_client_with_timeout(DEFAULT_REQUEST_TIMEOUT)
}

/// Build a client with an explicit request timeout.
///
/// Site provisioning can block for many minutes while the storefront is built.
pub fn build_client_with_timeout(request_timeout: Duration) -> Result<Client, InfraError> {
    Client::builder()
        .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
        .timeout(request_timeout)
        .build()
        .map_err(InfraError::HttpClient)
}
