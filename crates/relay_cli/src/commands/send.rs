use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use clap::Args;
use core_model::event::ConversionEvent;
use core_model::log::ConversionLogRow;
use core_model::pii::{Base64Decryptor, FieldDecryptor};
use core_types::Destination;
use destination_adapters::adapter_for;
use relay_store::{ConversionLogStore, JsonlConversionLogStore};
use serde_json::json;

use crate::app::AppContext;
use crate::commands::CliCommand;
use crate::config;

/// Dispatch one captured conversion event to a destination and record the
/// outcome in the conversion log.
#[derive(Args, Debug, Clone)]
pub struct SendCommand {
    /// Path to a conversion event JSON file.
    #[arg(long)]
    pub event: PathBuf,
    /// Destination key (meta, google, tiktok, pinterest, snapchat).
    #[arg(long)]
    pub destination: String,
}

#[async_trait]
impl CliCommand for SendCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let app_config = ctx.config()?;

        let raw = fs::read_to_string(&self.event)
            .with_context(|| format!("failed to read event file {}", self.event.display()))?;
        let event: ConversionEvent = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse event file {}", self.event.display()))?;

        let destination = Destination::from_key(&self.destination);
        let decryptor: Arc<dyn FieldDecryptor> = Arc::new(Base64Decryptor);
        let adapter = adapter_for(&destination, decryptor).with_context(|| {
            format!(
                "no server-side adapter for destination `{}`",
                destination.as_key()
            )
        })?;
        let credentials = config::destination_credentials(&destination);

        let result = adapter.send_event(&event, &credentials).await;
        match &result.error {
            None => println!(
                "delivered {} to {} (HTTP {})",
                event.event_id,
                destination.display_name(),
                result.status_code.unwrap_or_default()
            ),
            Some(error) => println!(
                "delivery of {} to {} failed: {}",
                event.event_id,
                destination.display_name(),
                error
            ),
        }

        let row = ConversionLogRow {
            id: event.id.clone(),
            shop_id: event.shop_id.clone(),
            event_type: event.event_name.clone(),
            destination,
            status: (if result.ok { "sent" } else { "failed" }).to_string(),
            value: event.value.clone(),
            currency: event.currency.clone(),
            error_message: result.error.clone(),
            payload: json!({
                "data": {
                    "value": event.value,
                    "currency": event.currency,
                    "items": event.items,
                },
                "delivery": result,
            }),
            created_at: Utc::now(),
        };
        let store = JsonlConversionLogStore::new(&app_config.data_dir);
        store.append(&row)?;

        Ok(())
    }
}
