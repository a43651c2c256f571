//! RhymeRumble Node - the main application entry point.
//!
//! Architecture:
//! - Single daemon process with shared RocksDB storage
//! - HTTP API for clients (profiles, themes, poems, leaderboard, friends)
//! - WebSocket stream of friendship notifications

use crate::api;
use crate::error::{Error, Result};
use crate::notify::BroadcastNotifier;
use crate::storage::Storage;
use rumble_social::{DeclinePolicy, Friendships};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Configuration for a node.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Data directory for storage
    pub data_dir: PathBuf,

    /// HTTP API listen address
    pub api_addr: SocketAddr,

    /// What declining a friend request does
    pub decline_policy: DeclinePolicy,

    /// Buffered notifications per subscriber before it starts skipping
    pub notify_capacity: usize,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./rumble-data"),
            api_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            decline_policy: DeclinePolicy::Release,
            notify_capacity: 256,
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from any key lookup (environment, file, test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("RUMBLE_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let api_addr = match lookup("RUMBLE_API_ADDR") {
            Some(addr) => addr
                .parse()
                .map_err(|_| Error::InvalidInput(format!("Invalid RUMBLE_API_ADDR: {}", addr)))?,
            None => defaults.api_addr,
        };

        let decline_policy = match lookup("RUMBLE_DECLINE_POLICY").as_deref() {
            None => defaults.decline_policy,
            Some("release") => DeclinePolicy::Release,
            Some("block") => DeclinePolicy::Block,
            Some(other) => {
                return Err(Error::InvalidInput(format!(
                    "Invalid RUMBLE_DECLINE_POLICY: {} (expected release or block)",
                    other
                )))
            }
        };

        let notify_capacity = match lookup("RUMBLE_NOTIFY_CAPACITY") {
            Some(cap) => cap.parse().map_err(|_| {
                Error::InvalidInput(format!("Invalid RUMBLE_NOTIFY_CAPACITY: {}", cap))
            })?,
            None => defaults.notify_capacity,
        };

        Ok(Self {
            data_dir,
            api_addr,
            decline_policy,
            notify_capacity,
        })
    }
}

/// Shared state for the node - single storage instance shared by all components.
pub struct RumbleState {
    pub storage: Arc<Storage>,
    pub friendships: Friendships<Arc<Storage>, BroadcastNotifier>,
    pub notifier: BroadcastNotifier,
    pub config: NodeConfig,
}

impl RumbleState {
    /// Open storage under `config.data_dir` and wire up collaborators.
    pub fn open(config: NodeConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let storage = Arc::new(Storage::open(&config.data_dir)?);
        let notifier = BroadcastNotifier::new(config.notify_capacity);
        let friendships = Friendships::new(Arc::clone(&storage), notifier.clone())
            .with_decline_policy(config.decline_policy);

        Ok(Self {
            storage,
            friendships,
            notifier,
            config,
        })
    }
}

/// A node instance.
pub struct RumbleNode {
    state: Arc<RwLock<RumbleState>>,
    config: NodeConfig,
}

impl RumbleNode {
    /// Create a new node.
    pub async fn new(config: NodeConfig) -> Result<Self> {
        let state = Arc::new(RwLock::new(RumbleState::open(config.clone())?));
        Ok(Self { state, config })
    }

    /// Get the shared state (for API handlers).
    pub fn state(&self) -> Arc<RwLock<RumbleState>> {
        Arc::clone(&self.state)
    }

    /// Run the node (serves the HTTP API until the listener fails).
    pub async fn run(self) -> Result<()> {
        tracing::info!("RhymeRumble node starting");
        tracing::info!("  API: http://{}", self.config.api_addr);
        tracing::info!("  Data: {:?}", self.config.data_dir);
        tracing::info!("  Decline policy: {:?}", self.config.decline_policy);

        let app = api::build_router(self.state());

        let listener = tokio::net::TcpListener::bind(self.config.api_addr).await?;
        tracing::info!("HTTP server listening on {}", self.config.api_addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
