//! Field-level drift detection between configuration generations.

use chrono::{DateTime, Utc};
use core_model::config::DestinationSettings;
use core_types::Destination;
use relay_store::ConfigStore;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigDifference {
    pub field: &'static str,
    pub change: ChangeKind,
    pub previous: Option<Value>,
    pub current: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ChangeSummary {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigComparison {
    pub shop_id: String,
    pub destination: Destination,
    pub config_version: u64,
    pub has_changes: bool,
    pub differences: Vec<ConfigDifference>,
    pub summary: ChangeSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigVersionEntry {
    pub version: u64,
    pub updated_at: DateTime<Utc>,
    pub current: bool,
}

/// Compare the live settings against the retained previous generation.
///
/// A destination that has never been reconfigured reports no changes.
/// Storage failures collapse to `None`: comparison is best-effort and never
/// fatal to a caller.
pub fn compare_config_versions(
    store: &dyn ConfigStore,
    shop_id: &str,
    destination: &Destination,
) -> Option<ConfigComparison> {
    let config = match store.load(shop_id, destination) {
        Ok(Some(config)) => config,
        Ok(None) => {
            warn!(shop_id, destination = destination.as_key(), "no destination config to compare");
            return None;
        }
        Err(err) => {
            warn!(
                shop_id,
                destination = destination.as_key(),
                error = %err,
                "failed to load destination config for comparison"
            );
            return None;
        }
    };

    let differences = match &config.previous {
        Some(previous) => diff_settings(previous, &config.settings),
        None => Vec::new(),
    };
    let summary = summarize(&differences);

    Some(ConfigComparison {
        shop_id: shop_id.to_string(),
        destination: destination.clone(),
        config_version: config.config_version,
        has_changes: !differences.is_empty(),
        differences,
        summary,
    })
}

/// Per-field delta over the tracked settings projection. Modification is
/// decided by canonical JSON serialization: maps compare order-independently
/// (keys are sorted), embedded arrays and blobs compare by their serialized
/// form.
pub fn diff_settings(
    previous: &DestinationSettings,
    current: &DestinationSettings,
) -> Vec<ConfigDifference> {
    let mut differences = Vec::new();
    for ((field, prev), (_, cur)) in previous
        .tracked_fields()
        .into_iter()
        .zip(current.tracked_fields())
    {
        let change = match (&prev, &cur) {
            (None, None) => continue,
            (Some(_), None) => ChangeKind::Removed,
            (None, Some(_)) => ChangeKind::Added,
            (Some(p), Some(c)) => {
                if canonical(p) == canonical(c) {
                    continue;
                }
                ChangeKind::Modified
            }
        };
        differences.push(ConfigDifference {
            field,
            change,
            previous: prev,
            current: cur,
        });
    }
    differences
}

/// Reconstructable history: the live generation and, when one is retained,
/// its predecessor with the row's creation time as an approximate update
/// time. Deeper generations are not stored.
pub fn config_version_history(
    store: &dyn ConfigStore,
    shop_id: &str,
    destination: &Destination,
) -> Vec<ConfigVersionEntry> {
    let config = match store.load(shop_id, destination) {
        Ok(Some(config)) => config,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(
                shop_id,
                destination = destination.as_key(),
                error = %err,
                "failed to load destination config for history"
            );
            return Vec::new();
        }
    };

    let mut entries = vec![ConfigVersionEntry {
        version: config.config_version,
        updated_at: config.updated_at,
        current: true,
    }];
    if config.previous.is_some() && config.config_version > 1 {
        entries.push(ConfigVersionEntry {
            version: config.config_version - 1,
            updated_at: config.created_at,
            current: false,
        });
    }
    entries
}

fn summarize(differences: &[ConfigDifference]) -> ChangeSummary {
    let mut summary = ChangeSummary::default();
    for difference in differences {
        match difference.change {
            ChangeKind::Added => summary.added += 1,
            ChangeKind::Removed => summary.removed += 1,
            ChangeKind::Modified => summary.modified += 1,
        }
    }
    summary
}

fn canonical(value: &Value) -> String {
    value.to_string()
}
