use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use clap::Args;
use relay_audit::security::{hmac_security_stats, DEFAULT_LOOKBACK_HOURS};
use relay_store::{JsonlReceiptStore, JsonlSecretStore};

use crate::app::AppContext;
use crate::commands::CliCommand;

/// Report ingestion-secret rotation state and anomaly signals.
#[derive(Args, Debug, Clone)]
pub struct SecurityCommand {
    #[arg(long)]
    pub shop: String,
    /// Lookback window in hours.
    #[arg(long, default_value_t = DEFAULT_LOOKBACK_HOURS)]
    pub hours: i64,
}

#[async_trait]
impl CliCommand for SecurityCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let app_config = ctx.config()?;
        let secrets = JsonlSecretStore::new(&app_config.data_dir);
        let receipts = JsonlReceiptStore::new(&app_config.data_dir);

        let stats =
            hmac_security_stats(&secrets, &receipts, &self.shop, self.hours, Utc::now());

        println!("security stats for {} (last {}h)", stats.shop_id, stats.window_hours);
        println!(
            "  rotation: {}{}",
            if stats.has_rotated { "rotated" } else { "never rotated" },
            stats
                .last_rotation_at
                .map(|at| format!(" (last at {at})"))
                .unwrap_or_default()
        );
        println!(
            "  grace window: {}{}",
            if stats.grace_window_active { "active" } else { "inactive" },
            stats
                .grace_window_expires_at
                .map(|at| format!(" (expires {at})"))
                .unwrap_or_default()
        );
        println!("  null-origin receipts: {}", stats.null_origin_count);
        println!("  signature errors: {}", stats.invalid_signature_count);
        println!(
            "  suspicious activity: {}{}",
            stats.suspicious_activity_count,
            stats
                .last_suspicious_at
                .map(|at| format!(" (last at {at})"))
                .unwrap_or_default()
        );
        Ok(())
    }
}
