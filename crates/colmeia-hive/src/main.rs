//! Hive node binary
//!
//! Serves the colmeia group API over HTTP.

use colmeia_hive::{HiveConfig, HiveNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hive_node=info,colmeia_hive=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Hive Node");

    let config = HiveConfig::from_env()?;

    let node = HiveNode::new(config)?;
    node.run().await?;

    Ok(())
}
