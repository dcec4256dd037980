use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ERROR_INVALID_SIGNATURE: &str = "invalid_signature";
pub const ERROR_MISSING_SIGNATURE: &str = "missing_signature";

/// Append-only record of one inbound pixel event as the ingestion endpoint
/// received it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionReceipt {
    pub id: String,
    pub shop_id: String,
    pub received_at: DateTime<Utc>,
    /// Origin header as recorded; absent when the client sent none.
    pub origin: Option<String>,
    /// Validation error code, when ingestion rejected the payload.
    pub error_code: Option<String>,
    #[serde(default)]
    pub payload: Value,
}

impl IngestionReceipt {
    /// Some deployments record a missing Origin header as an empty string;
    /// both mean "no origin".
    pub fn has_origin(&self) -> bool {
        self.origin
            .as_deref()
            .map(|o| !o.trim().is_empty())
            .unwrap_or(false)
    }

    pub fn is_signature_error(&self) -> bool {
        matches!(
            self.error_code.as_deref(),
            Some(ERROR_INVALID_SIGNATURE) | Some(ERROR_MISSING_SIGNATURE)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receipt(origin: Option<&str>, error_code: Option<&str>) -> IngestionReceipt {
        IngestionReceipt {
            id: "r1".to_string(),
            shop_id: "shop_1".to_string(),
            received_at: Utc::now(),
            origin: origin.map(str::to_string),
            error_code: error_code.map(str::to_string),
            payload: Value::Null,
        }
    }

    #[test]
    fn empty_origin_counts_as_absent() {
        assert!(receipt(Some("https://shop.example"), None).has_origin());
        assert!(!receipt(Some(""), None).has_origin());
        assert!(!receipt(None, None).has_origin());
    }

    #[test]
    fn signature_error_codes() {
        assert!(receipt(None, Some(ERROR_INVALID_SIGNATURE)).is_signature_error());
        assert!(receipt(None, Some(ERROR_MISSING_SIGNATURE)).is_signature_error());
        assert!(!receipt(None, Some("payload_too_large")).is_signature_error());
        assert!(!receipt(None, None).is_signature_error());
    }
}
