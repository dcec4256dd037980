use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use core_model::log::ConversionLogRow;
use core_types::Destination;

use crate::jsonl::{append_jsonl, ensure_dir, jsonl_name, read_jsonl};

const CONVERSIONS_DIR: &str = "conversions";

/// Read/append contract over the conversion delivery log.
pub trait ConversionLogStore: Send + Sync {
    /// Most-recent rows since `since`, newest first, capped at `limit`.
    fn recent_rows(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        limit: usize,
        destination: Option<&Destination>,
    ) -> Result<Vec<ConversionLogRow>>;

    fn rows_between(
        &self,
        shop_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        destination: Option<&Destination>,
    ) -> Result<Vec<ConversionLogRow>>;

    fn append(&self, row: &ConversionLogRow) -> Result<()>;
}

pub struct JsonlConversionLogStore {
    root: PathBuf,
}

impl JsonlConversionLogStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, shop_id: &str) -> PathBuf {
        self.root.join(CONVERSIONS_DIR).join(jsonl_name(shop_id))
    }
}

impl ConversionLogStore for JsonlConversionLogStore {
    fn recent_rows(
        &self,
        shop_id: &str,
        since: DateTime<Utc>,
        limit: usize,
        destination: Option<&Destination>,
    ) -> Result<Vec<ConversionLogRow>> {
        let mut rows: Vec<ConversionLogRow> = read_jsonl(&self.path_for(shop_id))?
            .into_iter()
            .filter(|row: &ConversionLogRow| row.created_at >= since)
            .filter(|row| destination.map(|d| &row.destination == d).unwrap_or(true))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows.truncate(limit);
        Ok(rows)
    }

    fn rows_between(
        &self,
        shop_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        destination: Option<&Destination>,
    ) -> Result<Vec<ConversionLogRow>> {
        Ok(read_jsonl(&self.path_for(shop_id))?
            .into_iter()
            .filter(|row: &ConversionLogRow| row.created_at >= start && row.created_at < end)
            .filter(|row| destination.map(|d| &row.destination == d).unwrap_or(true))
            .collect())
    }

    fn append(&self, row: &ConversionLogRow) -> Result<()> {
        let path = self.path_for(row.shop_id.as_str());
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        append_jsonl(&path, std::slice::from_ref(row))
    }
}
