pub mod config;
pub mod events;
pub mod security;
pub mod send;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Parser, Subcommand};

use crate::app::AppContext;

pub use config::ConfigCommand;
pub use events::EventsCommand;
pub use security::SecurityCommand;
pub use send::SendCommand;

#[async_trait]
pub trait CliCommand {
    async fn execute(&self, ctx: &AppContext) -> Result<()>;
}

#[derive(Parser, Debug, Clone)]
#[command(name = "pixel-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: RootCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RootCommand {
    Send(SendCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
    Security(SecurityCommand),
    #[command(subcommand)]
    Events(EventsCommand),
}

impl Cli {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        match self.command {
            RootCommand::Send(cmd) => cmd.execute(ctx).await,
            RootCommand::Config(cmd) => cmd.execute(ctx).await,
            RootCommand::Security(cmd) => cmd.execute(ctx).await,
            RootCommand::Events(cmd) => cmd.execute(ctx).await,
        }
    }
}
