use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use core_model::config::{DestinationConfig, DestinationSettings};
use core_types::Destination;

use crate::jsonl::{append_jsonl, ensure_dir, jsonl_name, read_last_snapshot};

const CONFIGS_DIR: &str = "configs";

/// Read/write contract for destination configuration snapshots.
pub trait ConfigStore: Send + Sync {
    fn load(&self, shop_id: &str, destination: &Destination) -> Result<Option<DestinationConfig>>;

    /// Persist new settings, superseding (and retaining) the live snapshot.
    fn save_settings(
        &self,
        shop_id: &str,
        destination: &Destination,
        settings: DestinationSettings,
    ) -> Result<DestinationConfig>;
}

/// One file per (shop, destination); each save appends a full config row and
/// the last line is the live one.
pub struct JsonlConfigStore {
    root: PathBuf,
}

impl JsonlConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, shop_id: &str, destination: &Destination) -> PathBuf {
        self.root
            .join(CONFIGS_DIR)
            .join(shop_id)
            .join(jsonl_name(destination.as_key()))
    }
}

impl ConfigStore for JsonlConfigStore {
    fn load(&self, shop_id: &str, destination: &Destination) -> Result<Option<DestinationConfig>> {
        read_last_snapshot(&self.path_for(shop_id, destination))
    }

    fn save_settings(
        &self,
        shop_id: &str,
        destination: &Destination,
        settings: DestinationSettings,
    ) -> Result<DestinationConfig> {
        let path = self.path_for(shop_id, destination);
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let now = Utc::now();
        let next = match read_last_snapshot::<DestinationConfig>(&path)? {
            Some(current) => current.superseded_by(settings, now),
            None => DestinationConfig::initial(shop_id, destination.clone(), settings, now),
        };
        append_jsonl(&path, std::slice::from_ref(&next))?;
        Ok(next)
    }
}
