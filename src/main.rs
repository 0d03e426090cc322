use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    crawltrail_cli::cli::app::run().await
}
