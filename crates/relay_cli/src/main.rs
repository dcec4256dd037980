use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    relay_cli::app::run().await
}
