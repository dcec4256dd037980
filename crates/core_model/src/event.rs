use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pii::SealedField;

/// Consent purposes granted by the shopper at capture time.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ConsentFlags {
    #[serde(default)]
    pub marketing: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub sale_of_data: bool,
}

/// Canonical conversion event, independent of any destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionEvent {
    pub id: String,
    pub shop_id: String,
    /// Storefront vocabulary, e.g. "checkout_completed".
    pub event_name: String,
    /// Deduplication id shared with the client-side pixel.
    pub event_id: String,
    pub client_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
    /// Epoch milliseconds as captured by the pixel; 0 when not captured.
    #[serde(default)]
    pub timestamp_ms: i64,
    #[serde(default)]
    pub ip: SealedField,
    #[serde(default)]
    pub user_agent: SealedField,
    pub page_url: Option<String>,
    pub referrer: Option<String>,
    pub query_string: Option<String>,
    pub currency: Option<String>,
    /// String, number, or null as captured upstream; coerced at the edge.
    #[serde(default)]
    pub value: Value,
    pub transaction_id: Option<String>,
    /// Ordered line items as opaque records.
    #[serde(default)]
    pub items: Vec<Value>,
    pub email_sha256: Option<String>,
    pub phone_sha256: Option<String>,
    pub first_name_sha256: Option<String>,
    pub last_name_sha256: Option<String>,
    #[serde(default)]
    pub consent: ConsentFlags,
}

impl ConversionEvent {
    /// Event time in whole epoch seconds, preferring the pixel's own stamp.
    pub fn epoch_seconds(&self) -> i64 {
        if self.timestamp_ms > 0 {
            self.timestamp_ms / 1000
        } else {
            self.occurred_at.timestamp()
        }
    }

    /// Event time in epoch milliseconds.
    pub fn epoch_millis(&self) -> i64 {
        if self.timestamp_ms > 0 {
            self.timestamp_ms
        } else {
            self.occurred_at.timestamp_millis()
        }
    }
}
