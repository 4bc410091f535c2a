use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::ErrorCode;

/// Envelope returned by every endpoint.
///
/// Exactly one of `data` / `error` is present: `data` when `success` is true,
/// `error` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMetadata {
    /// RFC 3339 timestamp with millisecond precision, always UTC.
    pub timestamp: String,
}

impl ResponseMetadata {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            timestamp: instant.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn now() -> Self {
        Self::at(Utc::now())
    }
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata: ResponseMetadata::now(),
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
                details,
            }),
            metadata: ResponseMetadata::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn success_envelope_omits_error() {
        let resp = ApiResponse::ok(serde_json::json!({ "outcome": "recorded" }));
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["outcome"], "recorded");
        assert!(json.get("error").is_none());
        assert!(json["metadata"]["timestamp"].is_string());
    }

    #[test]
    fn failure_envelope_omits_data_and_empty_details() {
        let resp = ApiResponse::failure(ErrorCode::InternalError, "Internal error", None);
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        assert!(json["error"].get("details").is_none());
    }

    #[test]
    fn metadata_timestamp_is_utc_millis() {
        let instant = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let meta = ResponseMetadata::at(instant);
        assert_eq!(meta.timestamp, "2024-03-31T23:59:59.000Z");
    }
}
