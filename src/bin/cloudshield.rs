use anyhow::Result;
use cloudshield::cli::start;

// Main function
#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments and initialize telemetry
    let action = start()?;

    // Handle the action
    action.execute().await?;

    Ok(())
}
