//! RhymeRumble node binary

use rumble_node::{NodeConfig, RumbleNode};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rumble_node=info,rumble=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting RhymeRumble node");

    let config = NodeConfig::from_env()?;

    let node = RumbleNode::new(config).await?;
    node.run().await?;

    Ok(())
}
