//! Poem and like models.

use serde::{Deserialize, Serialize};

/// Which side of the theme's duality a poem argues for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "option_1")]
    Option1,
    #[serde(rename = "option_2")]
    Option2,
    #[serde(rename = "neutral")]
    Neutral,
}

/// A poem submitted to a theme.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poem {
    pub id: String,

    pub theme_id: String,

    pub author_id: String,

    pub title: String,

    pub content: String,

    pub side: Side,

    /// Mirrors the number of stored likes
    #[serde(default)]
    pub likes_count: i64,

    pub created_at: u64,

    pub updated_at: u64,
}

impl Poem {
    pub fn new(
        id: String,
        theme_id: String,
        author_id: String,
        title: String,
        content: String,
        side: Side,
    ) -> Self {
        let now = rumble_social::now_millis();
        Self {
            id,
            theme_id,
            author_id,
            title,
            content,
            side,
            likes_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Ordering used to pick a theme winner: most likes, then earliest, then id.
    pub fn beats(&self, other: &Poem) -> bool {
        (other.likes_count, std::cmp::Reverse(other.created_at), std::cmp::Reverse(&other.id))
            < (self.likes_count, std::cmp::Reverse(self.created_at), std::cmp::Reverse(&self.id))
    }
}

/// One user's like on one poem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PoemLike {
    pub poem_id: String,
    pub user_id: String,
    pub created_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poem(id: &str, likes: i64, created_at: u64) -> Poem {
        let mut p = Poem::new(
            id.into(),
            "t".into(),
            "u".into(),
            "Title".into(),
            "Lines".into(),
            Side::Neutral,
        );
        p.likes_count = likes;
        p.created_at = created_at;
        p
    }

    #[test]
    fn more_likes_wins() {
        assert!(poem("a", 5, 10).beats(&poem("b", 4, 1)));
        assert!(!poem("a", 4, 1).beats(&poem("b", 5, 10)));
    }

    #[test]
    fn earlier_breaks_like_ties() {
        assert!(poem("b", 5, 1).beats(&poem("a", 5, 2)));
    }

    #[test]
    fn id_breaks_full_ties() {
        assert!(poem("a", 5, 1).beats(&poem("b", 5, 1)));
        assert!(!poem("a", 5, 1).beats(&poem("a", 5, 1)));
    }

    #[test]
    fn side_wire_format() {
        assert_eq!(serde_json::to_string(&Side::Option1).unwrap(), "\"option_1\"");
        let side: Side = serde_json::from_str("\"neutral\"").unwrap();
        assert_eq!(side, Side::Neutral);
    }
}
