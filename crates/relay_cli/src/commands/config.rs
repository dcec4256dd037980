use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Subcommand};
use core_types::Destination;
use relay_audit::config_diff::{compare_config_versions, config_version_history};
use relay_store::JsonlConfigStore;

use crate::app::AppContext;
use crate::commands::CliCommand;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Show field-level drift between the live and previous configuration.
    Diff(ConfigTarget),
    /// List the reconstructable configuration versions.
    History(ConfigTarget),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigTarget {
    #[arg(long)]
    pub shop: String,
    /// Destination key (meta, google, tiktok, pinterest, snapchat).
    #[arg(long)]
    pub destination: String,
}

#[async_trait]
impl CliCommand for ConfigCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()> {
        let app_config = ctx.config()?;
        let store = JsonlConfigStore::new(&app_config.data_dir);

        match self {
            ConfigCommand::Diff(target) => {
                let destination = Destination::from_key(&target.destination);
                match compare_config_versions(&store, &target.shop, &destination) {
                    Some(comparison) => {
                        println!(
                            "config v{} for {} / {}: {} change(s) ({} added, {} removed, {} modified)",
                            comparison.config_version,
                            target.shop,
                            destination.display_name(),
                            comparison.differences.len(),
                            comparison.summary.added,
                            comparison.summary.removed,
                            comparison.summary.modified
                        );
                        for difference in &comparison.differences {
                            println!(
                                "  {:?} {}: {} -> {}",
                                difference.change,
                                difference.field,
                                difference
                                    .previous
                                    .as_ref()
                                    .map(|v| v.to_string())
                                    .unwrap_or_else(|| "(absent)".to_string()),
                                difference
                                    .current
                                    .as_ref()
                                    .map(|v| v.to_string())
                                    .unwrap_or_else(|| "(absent)".to_string()),
                            );
                        }
                    }
                    None => println!(
                        "no comparison available for {} / {} (no config, or storage error)",
                        target.shop, target.destination
                    ),
                }
            }
            ConfigCommand::History(target) => {
                let destination = Destination::from_key(&target.destination);
                let history = config_version_history(&store, &target.shop, &destination);
                if history.is_empty() {
                    println!(
                        "no configuration recorded for {} / {}",
                        target.shop, target.destination
                    );
                }
                for entry in history {
                    println!(
                        "  v{}{} updated {}",
                        entry.version,
                        if entry.current { " (current)" } else { "" },
                        entry.updated_at
                    );
                }
            }
        }
        Ok(())
    }
}
