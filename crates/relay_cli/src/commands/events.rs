use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use clap::{Args, Subcommand};
use core_types::Destination;
use relay_audit::completeness::{
    capture_recent_events, check_parameter_completeness, event_statistics,
    DEFAULT_CAPTURE_WINDOW_MINUTES,
};
use relay_store::JsonlConversionLogStore;

use crate::app::AppContext;
use crate::commands::CliCommand;

#[derive(Subcommand, Debug, Clone)]
pub enum EventsCommand {
    /// Score the most recent deliveries for parameter completeness.
    Capture(CaptureArgs),
    /// Grouped delivery counts and completeness over a date range.
    Stats(StatsArgs),
    /// Check one event payload file for required parameters.
    Completeness(CompletenessArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    #[arg(long)]
    pub shop: String,
    /// Capture window in minutes.
    #[arg(long, default_value_t = DEFAULT_CAPTURE_WINDOW_MINUTES)]
    pub minutes: i64,
    /// Optional destination key filter.
    #[arg(long)]
    pub destination: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct StatsArgs {
    #[arg(long)]
    pub shop: String,
    /// Range start (RFC 3339).
    #[arg(long)]
    pub start: DateTime<Utc>,
    /// Range end (RFC 3339, exclusive).
    #[arg(long)]
    pub end: DateTime<Utc>,
    /// Optional destination key filter.
    #[arg(long)]
    pub destination: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletenessArgs {
    /// Path to an event payload JSON file.
    #[arg(long)]
    pub payload: PathBuf,
}

#[async_trait]
impl CliCommand for EventsCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        match self {
            EventsCommand::Capture(args) => {
                let app_config = ctx.config()?;
                let log = JsonlConversionLogStore::new(&app_config.data_dir);
                let destination = args.destination.as_deref().map(Destination::from_key);
                let since = Utc::now() - Duration::minutes(args.minutes);
                let summary =
                    capture_recent_events(&log, &args.shop, since, destination.as_ref());

                println!(
                    "{} event(s) in the last {}m: {} ok, {} failed, completeness {}%",
                    summary.total,
                    args.minutes,
                    summary.success,
                    summary.failed,
                    summary.completeness_rate
                );
                for event in &summary.events {
                    println!(
                        "  {} {} -> {} [{}] value={} completeness={}%{}",
                        event.created_at,
                        event.event_type,
                        event.destination.as_key(),
                        event.status.as_str(),
                        event.value,
                        event.completeness_rate,
                        event
                            .error_message
                            .as_deref()
                            .map(|e| format!(" ({e})"))
                            .unwrap_or_default()
                    );
                }
            }
            EventsCommand::Stats(args) => {
                let app_config = ctx.config()?;
                let log = JsonlConversionLogStore::new(&app_config.data_dir);
                let destination = args.destination.as_deref().map(Destination::from_key);
                let stats = event_statistics(
                    &log,
                    &args.shop,
                    args.start,
                    args.end,
                    destination.as_ref(),
                );

                println!(
                    "{} event(s), average completeness {}%",
                    stats.total, stats.average_completeness
                );
                for (label, counts) in [
                    ("event type", &stats.by_event_type),
                    ("destination", &stats.by_destination),
                    ("status", &stats.by_status),
                ] {
                    println!("  by {label}:");
                    for (key, count) in counts {
                        println!("    {key}: {count}");
                    }
                }
            }
            EventsCommand::Completeness(args) => {
                let raw = fs::read_to_string(&args.payload).with_context(|| {
                    format!("failed to read payload file {}", args.payload.display())
                })?;
                let payload = serde_json::from_str(&raw).with_context(|| {
                    format!("failed to parse payload file {}", args.payload.display())
                })?;
                let report = check_parameter_completeness(&payload);

                println!(
                    "completeness {}%: value={} currency={} items={}",
                    report.completeness_rate,
                    report.has_value,
                    report.has_currency,
                    report.has_items
                );
                if !report.missing_parameters.is_empty() {
                    println!("  missing: {}", report.missing_parameters.join(", "));
                }
            }
        }
        Ok(())
    }
}
