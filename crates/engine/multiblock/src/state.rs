//! Per-controller formation state and its load/change lifecycle

use crate::pattern::{BlockPattern, MatchContext, PatternError, Transform};
use crate::pos::BlockPos;
use crate::store::{StoreError, StructureCacheStore};
use crate::world::World;
use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Outcome of a lifecycle event, acted on by the owning controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing the controller has to react to
    Unchanged,
    /// Became formed
    Formed,
    /// Still formed; members and context were rebuilt
    Refreshed,
    /// Was formed, now is not
    Invalidated,
    /// Was formed, now waits for a chunk to load again
    Suspended,
    /// The controller cell itself changed
    Destroyed,
}

/// Runtime formation record of one controller.
///
/// `error` is `None` exactly while the structure is formed. The member cache
/// survives unloads and is the only part that gets persisted; the context is
/// rebuilt on every validation.
#[derive(Debug, Clone)]
pub struct MultiblockState {
    controller_pos: BlockPos,
    pattern: Arc<BlockPattern>,
    always_update: bool,
    error: Option<PatternError>,
    context: MatchContext,
    cache: HashSet<BlockPos>,
    transform: Option<Transform>,
}

impl MultiblockState {
    pub fn new(controller_pos: BlockPos, pattern: Arc<BlockPattern>, always_update: bool) -> Self {
        Self {
            controller_pos,
            pattern,
            always_update,
            error: Some(PatternError::Uninitialized),
            context: MatchContext::new(),
            cache: HashSet::new(),
            transform: None,
        }
    }

    pub fn controller_pos(&self) -> BlockPos {
        self.controller_pos
    }

    pub fn pattern(&self) -> &Arc<BlockPattern> {
        &self.pattern
    }

    /// Controllers that always update tick regardless of chunk loading
    pub fn always_update(&self) -> bool {
        self.always_update
    }

    pub fn error(&self) -> Option<&PatternError> {
        self.error.as_ref()
    }

    pub fn is_formed(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_destroyed(&self) -> bool {
        matches!(self.error, Some(PatternError::ControllerRemoved))
    }

    /// Context of the last successful match; empty while unformed
    pub fn context(&self) -> &MatchContext {
        &self.context
    }

    /// Absolute member positions, controller included
    pub fn cache(&self) -> &HashSet<BlockPos> {
        &self.cache
    }

    /// Orientation of the last successful match
    pub fn transform(&self) -> Option<Transform> {
        self.transform
    }

    /// Seed the member cache from saved data without validating
    pub fn restore_cache(&mut self, cache: impl IntoIterator<Item = BlockPos>) {
        self.cache = cache.into_iter().collect();
    }

    /// Run the pattern search and record the outcome.
    ///
    /// A transient failure keeps the member cache. Panics raised while
    /// searching are contained and reported as [`PatternError::Fault`].
    pub fn check_pattern(&mut self, world: &dyn World) -> Result<(), PatternError> {
        let pattern = &self.pattern;
        let controller = self.controller_pos;
        let result = panic::catch_unwind(AssertUnwindSafe(|| pattern.search(world, controller)))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    dimension = world.dimension(),
                    pos = %controller,
                    %message,
                    "structure validation faulted"
                );
                Err(PatternError::Fault(message))
            });

        self.context.clear();
        match result {
            Ok(found) => {
                self.context = found.context;
                self.cache = found.members;
                self.transform = Some(found.transform);
                self.error = None;
                Ok(())
            }
            Err(err) => {
                if !err.is_transient() {
                    self.cache.clear();
                    self.transform = None;
                }
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Validate after a chunk covering this structure loaded
    pub fn on_chunk_load(&mut self, world: &dyn World, store: &mut StructureCacheStore) -> Transition {
        if self.is_destroyed() {
            return Transition::Unchanged;
        }
        let was_formed = self.is_formed();
        let result = self.check_pattern(world);
        self.settle(was_formed, result, store)
    }

    /// A chunk covering this structure unloaded; the member cache is kept
    pub fn on_chunk_unload(&mut self, store: &mut StructureCacheStore) -> Transition {
        if self.is_destroyed() {
            return Transition::Unchanged;
        }
        let was_formed = self.is_formed();
        self.error = Some(PatternError::UnloadedChunk {
            pos: self.controller_pos,
        });
        self.context.clear();
        if !self.always_update {
            store.remove_loading(self.controller_pos);
        }
        tracing::debug!(controller = %self.controller_pos, "structure suspended by chunk unload");
        if was_formed {
            Transition::Suspended
        } else {
            Transition::Unchanged
        }
    }

    /// React to a change of the cell at `pos`
    pub fn on_block_state_changed(
        &mut self,
        pos: BlockPos,
        world: &dyn World,
        store: &mut StructureCacheStore,
    ) -> Transition {
        if self.is_destroyed() {
            return Transition::Unchanged;
        }
        if pos == self.controller_pos {
            store.remove_mapping(self.controller_pos);
            store.remove_loading(self.controller_pos);
            self.error = Some(PatternError::ControllerRemoved);
            self.context.clear();
            self.cache.clear();
            self.transform = None;
            tracing::debug!(controller = %self.controller_pos, "controller removed");
            return Transition::Destroyed;
        }
        if matches!(self.error, Some(PatternError::UnloadedChunk { .. })) {
            return Transition::Unchanged;
        }
        let was_formed = self.is_formed();
        let result = self.check_pattern(world);
        self.settle(was_formed, result, store)
    }

    fn settle(
        &mut self,
        was_formed: bool,
        result: Result<(), PatternError>,
        store: &mut StructureCacheStore,
    ) -> Transition {
        let lost = if was_formed {
            Transition::Invalidated
        } else {
            Transition::Unchanged
        };

        match result {
            Ok(()) => {
                if let Err(StoreError::PositionClaimed { pos, owner }) = store.add_mapping(self) {
                    tracing::debug!(controller = %self.controller_pos, %pos, %owner, "member already claimed");
                    store.remove_mapping(self.controller_pos);
                    store.remove_loading(self.controller_pos);
                    self.error = Some(PatternError::MemberClaimed { pos, owner });
                    self.context.clear();
                    self.cache.clear();
                    self.transform = None;
                    return lost;
                }
                if !self.always_update {
                    store.add_loading(self.controller_pos);
                }
                if was_formed {
                    Transition::Refreshed
                } else {
                    tracing::debug!(controller = %self.controller_pos, members = self.cache.len(), "structure formed");
                    Transition::Formed
                }
            }
            Err(err) if err.is_transient() => {
                if !self.always_update {
                    store.remove_loading(self.controller_pos);
                }
                if was_formed {
                    Transition::Suspended
                } else {
                    Transition::Unchanged
                }
            }
            Err(err) => {
                store.remove_mapping(self.controller_pos);
                store.remove_loading(self.controller_pos);
                if was_formed {
                    tracing::debug!(controller = %self.controller_pos, error = %err, "structure invalidated");
                }
                lost
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Predicate;
    use crate::world::{GridWorld, Occupant};

    const CONTROLLER: BlockPos = BlockPos::new(0, 0, 0);

    fn pattern() -> Arc<BlockPattern> {
        Arc::new(
            BlockPattern::builder()
                .aisle(["CSC"])
                .symbol('C', Predicate::blocks(["mbd:casing"]))
                .symbol('S', Predicate::controller("mbd:furnace"))
                .build()
                .unwrap(),
        )
    }

    fn built_world() -> GridWorld {
        let mut world = GridWorld::default();
        world.set(CONTROLLER, Occupant::component("mbd:furnace"));
        world.set(BlockPos::new(-1, 0, 0), Occupant::block("mbd:casing"));
        world.set(BlockPos::new(1, 0, 0), Occupant::block("mbd:casing"));
        world
    }

    #[test]
    fn test_starts_uninitialized() {
        let state = MultiblockState::new(CONTROLLER, pattern(), false);
        assert_eq!(state.error(), Some(&PatternError::Uninitialized));
        assert!(!state.is_formed());
        assert!(state.cache().is_empty());
    }

    #[test]
    fn test_chunk_load_forms_and_registers() {
        let world = built_world();
        let mut store = StructureCacheStore::new();
        let mut state = MultiblockState::new(CONTROLLER, pattern(), false);

        assert_eq!(state.on_chunk_load(&world, &mut store), Transition::Formed);
        assert!(state.is_formed());
        assert_eq!(state.cache().len(), 3);
        assert!(store.is_mapped(CONTROLLER));
        assert!(store.is_loading(CONTROLLER));

        assert_eq!(state.on_chunk_load(&world, &mut store), Transition::Refreshed);
    }

    #[test]
    fn test_always_update_skips_loading_set() {
        let world = built_world();
        let mut store = StructureCacheStore::new();
        let mut state = MultiblockState::new(CONTROLLER, pattern(), true);
        state.on_chunk_load(&world, &mut store);
        assert!(state.is_formed());
        assert!(!store.is_loading(CONTROLLER));
    }

    #[test]
    fn test_unload_keeps_cache() {
        let world = built_world();
        let mut store = StructureCacheStore::new();
        let mut state = MultiblockState::new(CONTROLLER, pattern(), false);
        state.on_chunk_load(&world, &mut store);

        assert_eq!(state.on_chunk_unload(&mut store), Transition::Suspended);
        assert!(matches!(state.error(), Some(PatternError::UnloadedChunk { .. })));
        assert_eq!(state.cache().len(), 3);
        assert!(state.context().is_empty());
        assert!(store.is_mapped(CONTROLLER));
        assert!(!store.is_loading(CONTROLLER));

        // changes are ignored until the chunk loads again
        assert_eq!(
            state.on_block_state_changed(BlockPos::new(1, 0, 0), &world, &mut store),
            Transition::Unchanged
        );
        assert_eq!(state.on_chunk_load(&world, &mut store), Transition::Formed);
    }

    #[test]
    fn test_member_change_invalidates() {
        let mut world = built_world();
        let mut store = StructureCacheStore::new();
        let mut state = MultiblockState::new(CONTROLLER, pattern(), false);
        state.on_chunk_load(&world, &mut store);

        world.remove(BlockPos::new(1, 0, 0));
        let transition = state.on_block_state_changed(BlockPos::new(1, 0, 0), &world, &mut store);
        assert_eq!(transition, Transition::Invalidated);
        assert!(state.error().is_some_and(PatternError::is_mismatch));
        assert!(state.cache().is_empty());
        assert!(!store.is_mapped(CONTROLLER));

        world.set(BlockPos::new(1, 0, 0), Occupant::block("mbd:casing"));
        let transition = state.on_block_state_changed(BlockPos::new(1, 0, 0), &world, &mut store);
        assert_eq!(transition, Transition::Formed);
    }

    #[test]
    fn test_controller_change_destroys() {
        let world = built_world();
        let mut store = StructureCacheStore::new();
        let mut state = MultiblockState::new(CONTROLLER, pattern(), false);
        state.on_chunk_load(&world, &mut store);

        assert_eq!(state.on_block_state_changed(CONTROLLER, &world, &mut store), Transition::Destroyed);
        assert!(!store.is_mapped(CONTROLLER));
        assert!(!store.is_loading(CONTROLLER));
        assert!(state.is_destroyed());
        assert_eq!(state.on_chunk_load(&world, &mut store), Transition::Unchanged);
    }

    #[test]
    fn test_panicking_predicate_is_contained() {
        let pattern = BlockPattern::builder()
            .aisle(["SB"])
            .symbol('S', Predicate::controller("mbd:furnace"))
            .symbol('B', Predicate::custom("broken", |_| panic!("predicate exploded")))
            .build()
            .unwrap();
        let world = built_world();
        let mut store = StructureCacheStore::new();
        let mut state = MultiblockState::new(CONTROLLER, Arc::new(pattern), false);

        assert_eq!(state.on_chunk_load(&world, &mut store), Transition::Unchanged);
        assert!(matches!(state.error(), Some(PatternError::Fault(msg)) if msg.contains("exploded")));
        assert!(!store.is_mapped(CONTROLLER));
    }
}
