//! Friendship edge model.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identifier.
pub type UserId = String;

/// Edge identifier (hex Blake3 digest).
pub type EdgeId = String;

/// Status of a stored edge. "No edge" is represented by absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStatus {
    Pending,
    Accepted,
    Blocked,
}

impl EdgeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeStatus::Pending => "pending",
            EdgeStatus::Accepted => "accepted",
            EdgeStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for EdgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical unordered pair: `lo <= hi` always.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    lo: UserId,
    hi: UserId,
}

impl PairKey {
    /// Normalize two ids into a pair key. Order of arguments does not matter.
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self { lo: a.to_string(), hi: b.to_string() }
        } else {
            Self { lo: b.to_string(), hi: a.to_string() }
        }
    }

    pub fn lo(&self) -> &str {
        &self.lo
    }

    pub fn hi(&self) -> &str {
        &self.hi
    }

    pub fn is_self_pair(&self) -> bool {
        self.lo == self.hi
    }

    pub fn contains(&self, user: &str) -> bool {
        self.lo == user || self.hi == user
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lo, self.hi)
    }
}

/// A friendship edge between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,

    /// Party that created the edge.
    pub user_a: UserId,

    /// The other party.
    pub user_b: UserId,

    pub status: EdgeStatus,

    /// Who sent the original request (for a block-created edge, the blocker).
    pub requested_by: UserId,

    /// Who moved the edge into `Blocked`, if anyone.
    #[serde(default)]
    pub blocked_by: Option<UserId>,

    /// Unix millis.
    pub created_at: u64,

    /// Unix millis.
    pub updated_at: u64,
}

impl Edge {
    /// A fresh edge created by `from` towards `to`.
    pub fn new(from: &str, to: &str, status: EdgeStatus) -> Self {
        let now = now_millis();
        Self {
            id: Self::generate_id(&PairKey::new(from, to), now),
            user_a: from.to_string(),
            user_b: to.to_string(),
            status,
            requested_by: from.to_string(),
            blocked_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Generate an edge id from the pair, creation time and a random nonce.
    pub fn generate_id(pair: &PairKey, created_at: u64) -> EdgeId {
        let nonce: u64 = rand::random();
        let mut hasher = blake3::Hasher::new();
        hasher.update(pair.to_string().as_bytes());
        hasher.update(&created_at.to_le_bytes());
        hasher.update(&nonce.to_le_bytes());
        hex::encode(hasher.finalize().as_bytes())
    }

    pub fn pair(&self) -> PairKey {
        PairKey::new(&self.user_a, &self.user_b)
    }

    pub fn involves(&self, user: &str) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// The party on the other side from `user`, if `user` is on this edge.
    pub fn other(&self, user: &str) -> Option<&str> {
        if self.user_a == user {
            Some(self.user_b.as_str())
        } else if self.user_b == user {
            Some(self.user_a.as_str())
        } else {
            None
        }
    }

    /// The party that did not send the request.
    pub fn recipient(&self) -> &str {
        self.other(&self.requested_by).unwrap_or(self.user_b.as_str())
    }

    /// Update status and bump `updated_at`.
    pub fn transition(&mut self, status: EdgeStatus) {
        self.status = status;
        self.updated_at = now_millis().max(self.updated_at);
    }
}

/// Current time in unix milliseconds.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
