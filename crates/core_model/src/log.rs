use chrono::{DateTime, Utc};
use core_types::Destination;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One delivery attempt as persisted by the relay.
///
/// `status` keeps the upstream vocabulary (`sent`, `ok`, `failed`, ...);
/// `value` keeps whatever decimal representation storage supplied. Both are
/// normalized on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionLogRow {
    pub id: String,
    pub shop_id: String,
    pub event_type: String,
    pub destination: Destination,
    pub status: String,
    #[serde(default)]
    pub value: Value,
    pub currency: Option<String>,
    pub error_message: Option<String>,
    /// Raw platform request/response blob.
    #[serde(default)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}
