//! Theme model - a battle between two sides.

use serde::{Deserialize, Serialize};

/// A poetry battle theme, e.g. "Friend" vs "Foe".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Theme {
    pub id: String,

    pub title: String,

    pub description: String,

    /// The two opposing sides
    pub duality: (String, String),

    /// Profile id of the creator
    pub created_by: String,

    /// Open for new poems
    pub is_active: bool,

    /// Optional closing time (unix millis)
    pub end_date: Option<u64>,

    /// Set once the theme is closed and has at least one poem
    #[serde(default)]
    pub winner_poem_id: Option<String>,

    /// When the theme was closed (unix millis)
    #[serde(default)]
    pub closed_at: Option<u64>,

    pub created_at: u64,

    pub updated_at: u64,
}

impl Theme {
    /// Create an open theme.
    pub fn new(
        id: String,
        title: String,
        description: String,
        duality: (String, String),
        created_by: String,
    ) -> Self {
        let now = rumble_social::now_millis();
        Self {
            id,
            title,
            description,
            duality,
            created_by,
            is_active: true,
            end_date: None,
            winner_poem_id: None,
            closed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether new poems are accepted at `now`.
    pub fn accepts_poems(&self, now: u64) -> bool {
        self.is_active && self.end_date.map_or(true, |end| now < end)
    }
}
