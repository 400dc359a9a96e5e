use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    jsonrelay::cli::run().await
}
