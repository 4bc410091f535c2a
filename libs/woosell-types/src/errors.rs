use serde::{Deserialize, Serialize};

/// Error codes carried in `error.code` of a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidSignature,
    MalformedPayload,
    InvalidInput,
    Unauthorized,
    Forbidden,
    NotFound,
    SiteNotFound,
    UpstreamProvisioningFailure,
    Timeout,
    DatabaseError,
    ConfigurationError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::MalformedPayload => "MALFORMED_PAYLOAD",
            Self::InvalidInput => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::SiteNotFound => "SITE_NOT_FOUND",
            Self::UpstreamProvisioningFailure => "UPSTREAM_PROVISIONING_FAILURE",
            Self::Timeout => "TIMEOUT",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
