//! Chunk-indexed registry of formed structures

use crate::pos::{BlockPos, ChunkPos};
use crate::state::MultiblockState;
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("position {pos} is already claimed by the controller at {owner}")]
    PositionClaimed { pos: BlockPos, owner: BlockPos },
}

/// Maps chunks to the controllers whose cached members lie in them.
///
/// A member position belongs to at most one controller. The store is owned by
/// a world or session object and lives as long as it does.
#[derive(Debug, Default)]
pub struct StructureCacheStore {
    chunks: HashMap<ChunkPos, BTreeSet<BlockPos>>,
    mappings: HashMap<BlockPos, HashSet<BlockPos>>,
    owners: HashMap<BlockPos, BlockPos>,
    loading: HashSet<BlockPos>,
}

impl StructureCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the cache of `state`, replacing whatever was indexed for it before.
    ///
    /// Fails without touching the index if any member is owned by another
    /// controller.
    pub fn add_mapping(&mut self, state: &MultiblockState) -> Result<(), StoreError> {
        let controller = state.controller_pos();
        let mut claimed: Vec<(BlockPos, BlockPos)> = state
            .cache()
            .iter()
            .filter_map(|pos| {
                self.owners
                    .get(pos)
                    .filter(|owner| **owner != controller)
                    .map(|owner| (*pos, *owner))
            })
            .collect();
        claimed.sort();
        if let Some(&(pos, owner)) = claimed.first() {
            return Err(StoreError::PositionClaimed { pos, owner });
        }

        self.remove_mapping(controller);
        for &pos in state.cache() {
            self.owners.insert(pos, controller);
            self.chunks.entry(pos.chunk()).or_default().insert(controller);
        }
        self.mappings.insert(controller, state.cache().clone());
        tracing::debug!(%controller, members = state.cache().len(), "structure mapping added");
        Ok(())
    }

    /// Drop everything indexed for `controller`. Removing twice is a no-op.
    pub fn remove_mapping(&mut self, controller: BlockPos) {
        let Some(members) = self.mappings.remove(&controller) else {
            return;
        };
        for pos in &members {
            if self.owners.get(pos) == Some(&controller) {
                self.owners.remove(pos);
            }
            let chunk = pos.chunk();
            if let Some(controllers) = self.chunks.get_mut(&chunk) {
                controllers.remove(&controller);
                if controllers.is_empty() {
                    self.chunks.remove(&chunk);
                }
            }
        }
        tracing::debug!(%controller, "structure mapping removed");
    }

    /// Controllers with at least one cached member in `chunk`, in position order
    pub fn controllers_in_chunk(&self, chunk: ChunkPos) -> impl Iterator<Item = BlockPos> + '_ {
        self.chunks.get(&chunk).into_iter().flatten().copied()
    }

    /// Controller whose cache contains `pos`
    pub fn owner_of(&self, pos: BlockPos) -> Option<BlockPos> {
        self.owners.get(&pos).copied()
    }

    pub fn mapping(&self, controller: BlockPos) -> Option<&HashSet<BlockPos>> {
        self.mappings.get(&controller)
    }

    pub fn is_mapped(&self, controller: BlockPos) -> bool {
        self.mappings.contains_key(&controller)
    }

    /// Number of indexed controllers
    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Mark a formed controller as ticking while its chunks are loaded
    pub fn add_loading(&mut self, controller: BlockPos) {
        self.loading.insert(controller);
    }

    pub fn remove_loading(&mut self, controller: BlockPos) {
        self.loading.remove(&controller);
    }

    pub fn is_loading(&self, controller: BlockPos) -> bool {
        self.loading.contains(&controller)
    }
}
