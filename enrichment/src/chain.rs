//! User-authored chains of beats.
//!
//! Chains own the canonical ordered id lists. The beat to chain index is
//! derived on load and kept in step with every mutation; it is never
//! persisted.

use std::collections::{BTreeMap, HashMap};

use bt_core::Chain;
use chrono::Utc;
use errors::ChainError;
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ChainStore {
    chains: Vec<Chain>,
    beat_index: HashMap<String, Vec<String>>
}

impl ChainStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(chains: Vec<Chain>) -> Self {
        let mut store = Self {
            chains,
            beat_index: HashMap::new()
        };
        store.rebuild_index();
        store
    }

    fn rebuild_index(&mut self) {
        self.beat_index.clear();
        for chain in &self.chains {
            for beat_id in &chain.beat_ids {
                self.beat_index
                    .entry(beat_id.clone())
                    .or_default()
                    .push(chain.id.clone());
            }
        }
    }

    pub fn create(&mut self, name: &str, beat_ids: Vec<String>) -> Result<&Chain, ChainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ChainError::NameRequired);
        }

        let now = Utc::now();
        let mut members: Vec<String> = Vec::with_capacity(beat_ids.len());
        for id in beat_ids {
            if !members.contains(&id) {
                members.push(id);
            }
        }
        let chain = Chain {
            id: utils::generate_prefixed_id("chain"),
            name: name.to_string(),
            beat_ids: members,
            created_at: now,
            updated_at: now,
            ripeness: 0.0
        };

        for beat_id in &chain.beat_ids {
            self.beat_index
                .entry(beat_id.clone())
                .or_default()
                .push(chain.id.clone());
        }
        info!(chain_id = %chain.id, beats = chain.beat_ids.len(), "Chain created");

        self.chains.push(chain);
        let last = self.chains.len() - 1;
        Ok(&self.chains[last])
    }

    pub fn get(&self, chain_id: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.id == chain_id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Resolve by id first, then by exact name.
    pub fn resolve(&self, id_or_name: &str) -> Option<&Chain> {
        self.get(id_or_name).or_else(|| self.get_by_name(id_or_name))
    }

    pub fn list(&self) -> &[Chain] {
        &self.chains
    }

    fn get_mut(&mut self, chain_id: &str) -> Result<&mut Chain, ChainError> {
        self.chains
            .iter_mut()
            .find(|c| c.id == chain_id)
            .ok_or_else(|| ChainError::NotFound {
                id: chain_id.to_string()
            })
    }

    /// Append a beat. Adding a beat already in the chain is a no-op.
    pub fn add_beat(&mut self, chain_id: &str, beat_id: &str) -> Result<(), ChainError> {
        let chain = self.get_mut(chain_id)?;
        if chain.beat_ids.iter().any(|id| id == beat_id) {
            return Ok(());
        }
        chain.beat_ids.push(beat_id.to_string());
        chain.updated_at = Utc::now();

        self.beat_index
            .entry(beat_id.to_string())
            .or_default()
            .push(chain_id.to_string());
        Ok(())
    }

    pub fn remove_beat(&mut self, chain_id: &str, beat_id: &str) -> Result<(), ChainError> {
        let chain = self.get_mut(chain_id)?;
        let Some(pos) = chain.beat_ids.iter().position(|id| id == beat_id) else {
            return Err(ChainError::BeatNotInChain {
                chain_id: chain_id.to_string(),
                beat_id: beat_id.to_string()
            });
        };
        chain.beat_ids.remove(pos);
        chain.updated_at = Utc::now();

        if let Some(ids) = self.beat_index.get_mut(beat_id) {
            ids.retain(|id| id != chain_id);
        }
        Ok(())
    }

    pub fn rename(&mut self, chain_id: &str, new_name: &str) -> Result<(), ChainError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ChainError::NameRequired);
        }
        let chain = self.get_mut(chain_id)?;
        chain.name = new_name.to_string();
        chain.updated_at = Utc::now();
        Ok(())
    }

    pub fn delete(&mut self, chain_id: &str) -> Result<Chain, ChainError> {
        let pos = self
            .chains
            .iter()
            .position(|c| c.id == chain_id)
            .ok_or_else(|| ChainError::NotFound {
                id: chain_id.to_string()
            })?;
        let removed = self.chains.remove(pos);
        for beat_id in &removed.beat_ids {
            if let Some(ids) = self.beat_index.get_mut(beat_id) {
                ids.retain(|id| id != chain_id);
            }
        }
        Ok(removed)
    }

    pub fn chains_for_beat(&self, beat_id: &str) -> Vec<&Chain> {
        self.beat_index
            .get(beat_id)
            .map(|ids| ids.iter().filter_map(|id| self.get(id)).collect())
            .unwrap_or_default()
    }

    /// Zero-based position of a beat and the chain length. `None` when the
    /// chain does not exist or does not contain the beat.
    pub fn beat_position(&self, chain_id: &str, beat_id: &str) -> Option<(usize, usize)> {
        let chain = self.get(chain_id)?;
        let index = chain.beat_ids.iter().position(|id| id == beat_id)?;
        Some((index, chain.beat_ids.len()))
    }

    /// Neighbours of a beat within a chain.
    pub fn adjacent_beats(&self, chain_id: &str, beat_id: &str) -> (Option<&str>, Option<&str>) {
        let Some(chain) = self.get(chain_id) else {
            return (None, None);
        };
        let Some(index) = chain.beat_ids.iter().position(|id| id == beat_id) else {
            return (None, None);
        };
        let prev = index
            .checked_sub(1)
            .map(|i| chain.beat_ids[i].as_str());
        let next = chain.beat_ids.get(index + 1).map(String::as_str);
        (prev, next)
    }

    /// Set every chain's ripeness to the mean of its scored members.
    pub fn refresh_ripeness(&mut self, scores: &BTreeMap<String, f64>) {
        for chain in &mut self.chains {
            chain.ripeness = chain_ripeness(chain, scores);
        }
    }

    /// Drop member ids that `keep` rejects.
    pub fn retain_beats(&mut self, keep: impl Fn(&str) -> bool) {
        for chain in &mut self.chains {
            chain.beat_ids.retain(|id| keep(id));
        }
        self.rebuild_index();
    }

    pub fn into_chains(self) -> Vec<Chain> {
        self.chains
    }
}

/// Mean cached score of a chain's members. Unscored members are ignored;
/// an empty or wholly unscored chain is 0.
pub fn chain_ripeness(chain: &Chain, scores: &BTreeMap<String, f64>) -> f64 {
    let scored: Vec<f64> = chain
        .beat_ids
        .iter()
        .filter_map(|id| scores.get(id).copied())
        .collect();
    if scored.is_empty() {
        return 0.0;
    }
    scored.iter().sum::<f64>() / scored.len() as f64
}
