//! Process-scoped embedding cache keyed by beat id.
//!
//! Beats are immutable, so an entry never goes stale and nothing is evicted.
//! Entries written before a cancelled or timed-out pass stay valid and are
//! reused by the next one.

use std::collections::HashMap;

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct EmbeddingCache {
    entries: DashMap<String, Vec<f32>>
}

impl EmbeddingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from vectors persisted elsewhere.
    pub fn from_map(vectors: HashMap<String, Vec<f32>>) -> Self {
        Self {
            entries: vectors.into_iter().collect()
        }
    }

    pub fn get(&self, beat_id: &str) -> Option<Vec<f32>> {
        self.entries.get(beat_id).map(|v| v.value().clone())
    }

    pub fn insert(&self, beat_id: impl Into<String>, vector: Vec<f32>) {
        self.entries.insert(beat_id.into(), vector);
    }

    pub fn contains(&self, beat_id: &str) -> bool {
        self.entries.contains_key(beat_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn snapshot(&self) -> HashMap<String, Vec<f32>> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}
