//! Ingestion-secret rotation state and anomaly signals over recent receipts.

use chrono::{DateTime, Duration, Utc};
use core_model::receipt::IngestionReceipt;
use core_model::secrets::ShopSecrets;
use relay_store::{ReceiptStore, SecretStore};
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

/// Isolated null-origin receipts are common and benign (server-to-server
/// clients, privacy proxies); only a burst above this count suggests
/// signature probing or a misconfigured client fleet.
pub const NULL_ORIGIN_BURST_THRESHOLD: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct SecurityStats {
    pub shop_id: String,
    pub window_hours: i64,
    pub has_rotated: bool,
    pub last_rotation_at: Option<DateTime<Utc>>,
    pub grace_window_active: bool,
    pub grace_window_expires_at: Option<DateTime<Utc>>,
    pub null_origin_count: usize,
    pub invalid_signature_count: usize,
    pub suspicious_activity_count: usize,
    pub last_suspicious_at: Option<DateTime<Utc>>,
}

/// Derive rotation and anomaly stats for a shop over the lookback window.
///
/// Degrades rather than fails: an unreadable secrets row reports
/// no-rotation/no-grace, unreadable receipts report zero counts; both are
/// logged so "zero" can be cross-checked against store health.
pub fn hmac_security_stats(
    secrets: &dyn SecretStore,
    receipts: &dyn ReceiptStore,
    shop_id: &str,
    lookback_hours: i64,
    now: DateTime<Utc>,
) -> SecurityStats {
    let secret_state: Option<ShopSecrets> = match secrets.load(shop_id) {
        Ok(state) => state,
        Err(err) => {
            warn!(shop_id, error = %err, "failed to load shop secrets");
            None
        }
    };

    let cutoff = now - Duration::hours(lookback_hours);
    let window: Vec<IngestionReceipt> = match receipts.receipts_since(shop_id, cutoff) {
        Ok(window) => window,
        Err(err) => {
            warn!(shop_id, error = %err, "failed to scan ingestion receipts");
            Vec::new()
        }
    };

    let mut null_origin_count = 0usize;
    let mut invalid_signature_count = 0usize;
    let mut last_suspicious_at: Option<DateTime<Utc>> = None;
    for receipt in &window {
        if !receipt.has_origin() {
            null_origin_count += 1;
        }
        if receipt.is_signature_error() {
            invalid_signature_count += 1;
            last_suspicious_at = Some(match last_suspicious_at {
                Some(existing) => existing.max(receipt.received_at),
                None => receipt.received_at,
            });
        }
    }

    let burst = if null_origin_count > NULL_ORIGIN_BURST_THRESHOLD {
        null_origin_count
    } else {
        0
    };

    SecurityStats {
        shop_id: shop_id.to_string(),
        window_hours: lookback_hours,
        has_rotated: secret_state
            .as_ref()
            .map(ShopSecrets::has_rotated)
            .unwrap_or(false),
        last_rotation_at: secret_state.as_ref().and_then(|s| s.rotated_at),
        grace_window_active: secret_state
            .as_ref()
            .map(|s| s.grace_window_active(now))
            .unwrap_or(false),
        grace_window_expires_at: secret_state
            .as_ref()
            .and_then(|s| s.previous_secret_expires_at),
        null_origin_count,
        invalid_signature_count,
        suspicious_activity_count: invalid_signature_count + burst,
        last_suspicious_at,
    }
}
