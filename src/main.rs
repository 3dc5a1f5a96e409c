use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dispensary_core::config_from_env_values;

/// Main entry point for the dispensary service
///
/// Resolves configuration once from the environment (and a `.env` file when present), then
/// serves the REST API over the file-backed store.
///
/// # Environment Variables
/// - `DISPENSARY_REST_ADDR`: REST server address (default: "127.0.0.1:3000")
/// - `DISPENSARY_DATA_DIR`: Directory holding the store (default: "dispensary_data")
/// - `DISPENSARY_LOW_STOCK_BELOW`: Stock below which a medication is low (default: 10)
/// - `DISPENSARY_MEDIUM_STOCK_BELOW`: Stock below which a medication is medium (default: 50)
/// - `DISPENSARY_PRESCRIPTION_VALIDITY_DAYS`: Default prescription validity (default: 90)
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration is invalid or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("dispensary_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = Arc::new(config_from_env_values(
        std::env::var("DISPENSARY_DATA_DIR").ok(),
        std::env::var("DISPENSARY_LOW_STOCK_BELOW").ok(),
        std::env::var("DISPENSARY_MEDIUM_STOCK_BELOW").ok(),
        std::env::var("DISPENSARY_PRESCRIPTION_VALIDITY_DAYS").ok(),
    )?);
    let rest_addr =
        std::env::var("DISPENSARY_REST_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());

    tracing::info!("++ Starting dispensary REST on {}", rest_addr);
    tracing::info!("++ Data directory: {}", cfg.data_dir().display());

    api_rest::serve(cfg, &rest_addr).await
}
