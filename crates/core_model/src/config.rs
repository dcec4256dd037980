use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use core_types::Destination;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tracked settings for one (shop, destination) pair.
///
/// Every field is optional so the drift detector can distinguish a field that
/// was cleared from one that changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationSettings {
    /// Pixel / measurement / ad-account identifier on the platform side.
    pub platform_id: Option<String>,
    pub client_side_enabled: Option<bool>,
    pub server_side_enabled: Option<bool>,
    /// Storefront event name -> destination event name overrides.
    pub event_mappings: Option<BTreeMap<String, String>>,
    /// Opaque blob forwarded to the client-side pixel.
    pub client_config: Option<Value>,
    pub environment: Option<String>,
}

impl DestinationSettings {
    /// Field projection consumed by the drift detector, in comparison order.
    pub fn tracked_fields(&self) -> Vec<(&'static str, Option<Value>)> {
        vec![
            (
                "platform_id",
                self.platform_id.clone().map(Value::String),
            ),
            (
                "client_side_enabled",
                self.client_side_enabled.map(Value::Bool),
            ),
            (
                "server_side_enabled",
                self.server_side_enabled.map(Value::Bool),
            ),
            (
                "event_mappings",
                self.event_mappings
                    .as_ref()
                    .and_then(|m| serde_json::to_value(m).ok()),
            ),
            ("client_config", self.client_config.clone()),
            (
                "environment",
                self.environment.clone().map(Value::String),
            ),
        ]
    }
}

/// Versioned snapshot of a destination's configuration.
///
/// Rows are superseded, never deleted: each save moves the live settings into
/// `previous` and bumps `config_version`. Only one historical generation is
/// retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub shop_id: String,
    pub destination: Destination,
    pub settings: DestinationSettings,
    pub config_version: u64,
    pub previous: Option<DestinationSettings>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DestinationConfig {
    /// First-ever configuration for a (shop, destination) pair.
    pub fn initial(
        shop_id: impl Into<String>,
        destination: Destination,
        settings: DestinationSettings,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            shop_id: shop_id.into(),
            destination,
            settings,
            config_version: 1,
            previous: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Supersede the live settings, retaining them as the previous snapshot.
    pub fn superseded_by(self, settings: DestinationSettings, now: DateTime<Utc>) -> Self {
        Self {
            shop_id: self.shop_id,
            destination: self.destination,
            previous: Some(self.settings),
            settings,
            config_version: self.config_version + 1,
            created_at: self.created_at,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(platform_id: &str) -> DestinationSettings {
        DestinationSettings {
            platform_id: Some(platform_id.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn supersede_moves_settings_into_previous() {
        let now = Utc::now();
        let first = DestinationConfig::initial("shop_1", Destination::Meta, settings("a"), now);
        assert_eq!(first.config_version, 1);
        assert!(first.previous.is_none());

        let later = Utc::now();
        let second = first.superseded_by(settings("b"), later);
        assert_eq!(second.config_version, 2);
        assert_eq!(
            second.previous.as_ref().and_then(|p| p.platform_id.clone()),
            Some("a".to_string())
        );
        assert_eq!(second.created_at, now);
        assert_eq!(second.updated_at, later);
    }
}
