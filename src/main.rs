use campus_calendar::startup;
use tracing::info;

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting campus calendar");

    // Load configuration
    let config = startup::load_config().await?;

    // Start the service
    startup::start_service(config).await
}
