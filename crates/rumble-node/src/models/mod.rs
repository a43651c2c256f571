//! Domain models for RhymeRumble.
//!
//! # Core Types
//!
//! - [`Profile`] - A poet: username, bio, avatar, points and level
//! - [`Theme`] - A battle topic with two opposing sides
//! - [`Poem`] - A short poem written for one side of a theme (or neither)
//! - [`PoemLike`] - One user's like on one poem

mod poem;
mod profile;
mod theme;

pub use poem::{Poem, PoemLike, Side};
pub use profile::{Profile, ProfileUpdate};
pub use theme::Theme;

/// Generate an id from content, the current time and a random nonce.
pub fn generate_id(content: &[u8]) -> String {
    let nonce: u64 = rand::random();
    let mut hasher = blake3::Hasher::new();
    hasher.update(content);
    hasher.update(&rumble_social::now_millis().to_le_bytes());
    hasher.update(&nonce.to_le_bytes());
    hex::encode(hasher.finalize().as_bytes())
}
