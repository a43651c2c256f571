//! Profile model - one per authenticated user.

use serde::{Deserialize, Serialize};

/// A poet's public profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    /// Id issued by the identity provider
    pub id: String,

    /// Unique handle (compared case-insensitively)
    pub username: String,

    pub full_name: Option<String>,

    /// Opaque URL; avatar files live elsewhere
    pub avatar_url: Option<String>,

    pub bio: Option<String>,

    #[serde(default)]
    pub points: i64,

    #[serde(default = "default_level")]
    pub level: u32,

    /// Unix millis
    pub created_at: u64,

    /// Unix millis
    pub updated_at: u64,
}

fn default_level() -> u32 {
    1
}

impl Profile {
    /// A fresh profile: zero points, level 1.
    pub fn new(id: String, username: String) -> Self {
        let now = rumble_social::now_millis();
        Self {
            id,
            username,
            full_name: None,
            avatar_url: None,
            bio: None,
            points: 0,
            level: default_level(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Fallback handle derived from an email address ("ana@x.io" -> "ana").
    pub fn username_from_email(email: &str) -> String {
        match email.split('@').next() {
            Some(local) if !local.is_empty() => local.to_string(),
            _ => "poet".to_string(),
        }
    }

    /// Lowercased username, used as the uniqueness key.
    pub fn username_key(username: &str) -> String {
        username.trim().to_lowercase()
    }
}

/// Editable profile fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
}

impl ProfileUpdate {
    /// Apply the non-empty fields to `profile`.
    pub fn apply(self, profile: &mut Profile, now: u64) {
        if let Some(username) = self.username {
            profile.username = username;
        }
        if let Some(full_name) = self.full_name {
            profile.full_name = Some(full_name);
        }
        if let Some(avatar_url) = self.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }
        if let Some(bio) = self.bio {
            profile.bio = Some(bio);
        }
        profile.updated_at = now.max(profile.updated_at);
    }
}
