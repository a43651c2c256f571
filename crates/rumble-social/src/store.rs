//! Edge persistence contract and an in-memory implementation.

use crate::edge::{Edge, PairKey};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failures reported by an [`EdgeStore`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An edge already exists for this pair.
    #[error("edge already exists for pair {0}")]
    Conflict(String),

    /// The backing store failed.
    #[error("{0}")]
    Backend(String),
}

/// Data-access collaborator for friendship edges.
///
/// Implementations must treat [`PairKey`] as the uniqueness key: `insert`
/// fails with [`StoreError::Conflict`] when the pair already has an edge.
/// Reads after a successful write must observe it.
pub trait EdgeStore {
    /// Edge for an unordered pair, if any.
    fn find_pair(&self, pair: &PairKey) -> Result<Option<Edge>, StoreError>;

    /// Edge by id.
    fn get_edge(&self, id: &str) -> Result<Option<Edge>, StoreError>;

    /// Store a new edge.
    fn insert_edge(&self, edge: &Edge) -> Result<(), StoreError>;

    /// Overwrite an existing edge (same id, same pair).
    fn update_edge(&self, edge: &Edge) -> Result<(), StoreError>;

    /// Delete an edge by id. Deleting a missing edge is not an error.
    fn delete_edge(&self, id: &str) -> Result<(), StoreError>;

    /// All edges touching `user`.
    fn edges_for(&self, user: &str) -> Result<Vec<Edge>, StoreError>;
}

impl<S: EdgeStore + ?Sized> EdgeStore for Arc<S> {
    fn find_pair(&self, pair: &PairKey) -> Result<Option<Edge>, StoreError> {
        (**self).find_pair(pair)
    }

    fn get_edge(&self, id: &str) -> Result<Option<Edge>, StoreError> {
        (**self).get_edge(id)
    }

    fn insert_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        (**self).insert_edge(edge)
    }

    fn update_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        (**self).update_edge(edge)
    }

    fn delete_edge(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete_edge(id)
    }

    fn edges_for(&self, user: &str) -> Result<Vec<Edge>, StoreError> {
        (**self).edges_for(user)
    }
}

#[derive(Debug, Default)]
struct MemoryInner {
    edges: HashMap<String, Edge>,
    pairs: HashMap<PairKey, String>,
}

/// Edge store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryEdgeStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryEdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored edges. Still counts after a poisoned lock.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .edges
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryInner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("edge store lock poisoned".into()))
    }
}

impl EdgeStore for MemoryEdgeStore {
    fn find_pair(&self, pair: &PairKey) -> Result<Option<Edge>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .pairs
            .get(pair)
            .and_then(|id| inner.edges.get(id))
            .cloned())
    }

    fn get_edge(&self, id: &str) -> Result<Option<Edge>, StoreError> {
        Ok(self.lock()?.edges.get(id).cloned())
    }

    fn insert_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let pair = edge.pair();
        if inner.pairs.contains_key(&pair) {
            return Err(StoreError::Conflict(pair.to_string()));
        }
        inner.pairs.insert(pair, edge.id.clone());
        inner.edges.insert(edge.id.clone(), edge.clone());
        Ok(())
    }

    fn update_edge(&self, edge: &Edge) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        match inner.edges.get_mut(&edge.id) {
            Some(existing) => {
                *existing = edge.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("edge {} not found", edge.id))),
        }
    }

    fn delete_edge(&self, id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if let Some(edge) = inner.edges.remove(id) {
            inner.pairs.remove(&edge.pair());
        }
        Ok(())
    }

    fn edges_for(&self, user: &str) -> Result<Vec<Edge>, StoreError> {
        let inner = self.lock()?;
        let mut edges: Vec<Edge> = inner
            .edges
            .values()
            .filter(|e| e.involves(user))
            .cloned()
            .collect();
        edges.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(edges)
    }
}
