use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use core_model::receipt::IngestionReceipt;

use crate::jsonl::{append_jsonl, ensure_dir, jsonl_name, read_jsonl};

const RECEIPTS_DIR: &str = "receipts";

/// Read contract over the append-only ingestion receipt log.
pub trait ReceiptStore: Send + Sync {
    fn receipts_since(
        &self,
        shop_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<IngestionReceipt>>;

    fn append(&self, receipt: &IngestionReceipt) -> Result<()>;
}

pub struct JsonlReceiptStore {
    root: PathBuf,
}

impl JsonlReceiptStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, shop_id: &str) -> PathBuf {
        self.root.join(RECEIPTS_DIR).join(jsonl_name(shop_id))
    }
}

impl ReceiptStore for JsonlReceiptStore {
    fn receipts_since(
        &self,
        shop_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<IngestionReceipt>> {
        let receipts: Vec<IngestionReceipt> = read_jsonl(&self.path_for(shop_id))?;
        Ok(receipts
            .into_iter()
            .filter(|receipt| receipt.received_at >= cutoff)
            .collect())
    }

    fn append(&self, receipt: &IngestionReceipt) -> Result<()> {
        let path = self.path_for(receipt.shop_id.as_str());
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        append_jsonl(&path, std::slice::from_ref(receipt))
    }
}
