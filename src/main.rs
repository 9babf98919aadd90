// Main entry point - Composition root for the persistence services
use persistence_history::infrastructure::config::load_settings;
use persistence_history::PersistenceContext;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings()?;

    // Build the context (application and infrastructure layers)
    let context = PersistenceContext::initialize(&settings).await?;

    match context.services.default_id().await {
        Ok(id) => tracing::info!("Default persistence service is '{}'", id),
        Err(e) => tracing::warn!("{}", e),
    }
    for service in context.management.list_services().await {
        tracing::info!(
            "Persistence service '{}' ({}) is {}",
            service.id,
            service.label,
            service.capability
        );
    }

    tokio::signal::ctrl_c().await?;
    context.shutdown().await;

    Ok(())
}
