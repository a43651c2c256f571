//! RhymeRumble Node - poetry battle server
//!
//! Users publish poems on two-sided themes, like each other's work, climb a
//! contribution leaderboard and befriend other poets.
//!
//! # Architecture
//!
//! - **Models**: Profiles, themes and poems
//! - **Storage**: RocksDB-backed persistent storage (also the friendship edge store)
//! - **API**: HTTP endpoints for clients
//! - **WS**: Live friendship notifications
//! - **Session**: Single-writer session state for embedding clients
//!
//! # Example
//!
//! ```no_run
//! use rumble_node::{NodeConfig, RumbleNode};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NodeConfig::from_env()?;
//!     let node = RumbleNode::new(config).await?;
//!     node.run().await?;
//!     Ok(())
//! }
//! ```

pub mod models;
pub mod storage;
pub mod node;
pub mod api;
pub mod ws;
pub mod notify;
pub mod session;
pub mod error;

pub use models::{Poem, PoemLike, Profile, ProfileUpdate, Side, Theme};
pub use storage::Storage;
pub use node::{NodeConfig, RumbleNode, RumbleState};
pub use notify::BroadcastNotifier;
pub use session::{SessionEvent, SessionHandle, SessionState};
pub use error::{Error, Result};
