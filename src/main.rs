use std::error::Error;
use tracing::info;

use filedock::{StorageConfig, StorageProviderFactory};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting Filedock");

    let config = StorageConfig::from_env();
    info!("Storage provider: {}", config.storage_type_str());

    let provider = StorageProviderFactory::from_config(config).await?;

    let prefix = std::env::args().nth(1).unwrap_or_default();
    let items = provider.list(&prefix).await?;
    info!("Listed {} items under '{}'", items.len(), prefix);

    println!("{}", serde_json::to_string_pretty(&items)?);

    Ok(())
}
