//! World-scoped owner of controllers and the structure cache store

use crate::config::MultiblockConfig;
use crate::controller::{ControllerComponent, ControllerDefinition};
use crate::events::{NoEvents, StructureEvents};
use crate::persistence::{PersistError, SavedStructures, StructureStorage};
use crate::pos::{BlockPos, ChunkPos};
use crate::state::Transition;
use crate::store::{StoreError, StructureCacheStore};
use crate::world::World;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Entry point an embedding world drives.
///
/// The world forwards block changes, chunk loads and unloads, and calls
/// [`MultiblockManager::tick`] once per simulation tick. Every call runs to
/// completion on the caller's thread.
pub struct MultiblockManager {
    config: MultiblockConfig,
    store: StructureCacheStore,
    controllers: BTreeMap<BlockPos, ControllerComponent>,
    events: Box<dyn StructureEvents>,
    pending: SavedStructures,
    ticks: u64,
}

impl MultiblockManager {
    pub fn new(config: MultiblockConfig) -> Self {
        Self {
            config,
            store: StructureCacheStore::new(),
            controllers: BTreeMap::new(),
            events: Box::new(NoEvents),
            pending: SavedStructures::new(),
            ticks: 0,
        }
    }

    /// Install the listener notified of structure changes
    pub fn with_events(mut self, events: impl StructureEvents + 'static) -> Self {
        self.events = Box::new(events);
        self
    }

    pub fn config(&self) -> &MultiblockConfig {
        &self.config
    }

    pub fn store(&self) -> &StructureCacheStore {
        &self.store
    }

    pub fn controller(&self, pos: BlockPos) -> Option<&ControllerComponent> {
        self.controllers.get(&pos)
    }

    pub fn controllers(&self) -> impl Iterator<Item = &ControllerComponent> {
        self.controllers.values()
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Ticks processed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Register a controller placed in the world.
    ///
    /// A saved cache for `pos`, if any, is restored and indexed so chunk loads
    /// reach the controller. Validation happens on the next chunk load,
    /// [`MultiblockManager::validate`] call or periodic revalidation.
    pub fn add_controller(&mut self, pos: BlockPos, definition: Arc<ControllerDefinition>) {
        self.remove_controller(pos);
        let mut component = ControllerComponent::new(pos, definition, &self.config);
        if let Some(cache) = self.pending.remove(pos) {
            component.state_mut().restore_cache(cache);
            index_restored(&mut self.store, &component);
        }
        tracing::debug!(controller = %pos, id = %component.definition().id, "controller added");
        self.controllers.insert(pos, component);
    }

    /// Unregister a controller, tearing its structure down
    pub fn remove_controller(&mut self, pos: BlockPos) -> Option<ControllerComponent> {
        let mut component = self.controllers.remove(&pos)?;
        self.store.remove_mapping(pos);
        self.store.remove_loading(pos);
        if component.is_formed() {
            component.tear_down(self.events.as_ref());
        }
        tracing::debug!(controller = %pos, "controller removed");
        Some(component)
    }

    /// Run the pattern check for one controller right away
    pub fn validate(&mut self, pos: BlockPos, world: &dyn World) -> Transition {
        let Some(component) = self.controllers.get_mut(&pos) else {
            return Transition::Unchanged;
        };
        let transition = component.state_mut().on_chunk_load(world, &mut self.store);
        component.apply(transition, world, self.events.as_ref());
        transition
    }

    /// The cell at `pos` changed
    pub fn on_block_changed(&mut self, pos: BlockPos, world: &dyn World) -> Vec<(BlockPos, Transition)> {
        let mut targets = BTreeSet::new();
        if let Some(owner) = self.store.owner_of(pos) {
            targets.insert(owner);
        }
        if self.controllers.contains_key(&pos) {
            targets.insert(pos);
        }
        self.dispatch(targets, world, |component, store| {
            component.state_mut().on_block_state_changed(pos, world, store)
        })
    }

    pub fn on_chunk_load(&mut self, chunk: ChunkPos, world: &dyn World) -> Vec<(BlockPos, Transition)> {
        let targets = self.controllers_touching(chunk);
        self.dispatch(targets, world, |component, store| {
            component.state_mut().on_chunk_load(world, store)
        })
    }

    pub fn on_chunk_unload(&mut self, chunk: ChunkPos, world: &dyn World) -> Vec<(BlockPos, Transition)> {
        let targets = self.controllers_touching(chunk);
        self.dispatch(targets, world, |component, store| {
            component.state_mut().on_chunk_unload(store)
        })
    }

    /// Advance every controller by one tick.
    ///
    /// Formed controllers run their recipes while loaded (or always, when
    /// they always update). Unformed ones re-check their pattern every
    /// `reform_interval` ticks.
    pub fn tick<R: Rng + ?Sized>(&mut self, world: &dyn World, rng: &mut R) {
        self.ticks += 1;
        let recheck = self.config.reform_interval > 0
            && self.ticks % u64::from(self.config.reform_interval) == 0;
        let events = self.events.as_ref();

        for (pos, component) in self.controllers.iter_mut() {
            if !component.is_formed() {
                if recheck && !component.state().is_destroyed() && world.is_loaded(*pos) {
                    let transition = component.state_mut().on_chunk_load(world, &mut self.store);
                    component.apply(transition, world, events);
                }
                continue;
            }
            if component.state().always_update() || self.store.is_loading(*pos) {
                component.tick(world, events, rng);
            }
        }
    }

    /// Member caches of every controller, plus saved caches not yet claimed
    pub fn save(&self) -> SavedStructures {
        let mut saved = self.pending.clone();
        for (pos, component) in &self.controllers {
            let cache = component.state().cache();
            if !cache.is_empty() {
                saved.insert(*pos, cache);
            }
        }
        saved
    }

    /// Seed member caches from saved data without validating.
    ///
    /// Caches for controllers not registered yet are kept until
    /// [`MultiblockManager::add_controller`] is called for them.
    pub fn restore(&mut self, mut saved: SavedStructures) {
        let controllers: Vec<BlockPos> = saved.controllers().collect();
        for pos in controllers {
            let Some(component) = self.controllers.get_mut(&pos) else {
                continue;
            };
            if let Some(cache) = saved.remove(pos) {
                component.state_mut().restore_cache(cache);
                index_restored(&mut self.store, component);
            }
        }
        tracing::debug!(pending = saved.len(), "structure caches restored");
        self.pending = saved;
    }

    pub fn save_to(&self, storage: &dyn StructureStorage) -> Result<(), PersistError> {
        storage.save(&self.save())
    }

    /// Restore from `storage`; a missing file counts as nothing saved
    pub fn load_from(&mut self, storage: &dyn StructureStorage) -> Result<(), PersistError> {
        match storage.load() {
            Ok(saved) => {
                self.restore(saved);
                Ok(())
            }
            Err(PersistError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn controllers_touching(&self, chunk: ChunkPos) -> BTreeSet<BlockPos> {
        let mut targets: BTreeSet<BlockPos> = self.store.controllers_in_chunk(chunk).collect();
        targets.extend(self.controllers.keys().copied().filter(|pos| chunk.contains(*pos)));
        targets
    }

    fn dispatch<F>(
        &mut self,
        targets: BTreeSet<BlockPos>,
        world: &dyn World,
        mut event: F,
    ) -> Vec<(BlockPos, Transition)>
    where
        F: FnMut(&mut ControllerComponent, &mut StructureCacheStore) -> Transition,
    {
        let mut out = Vec::new();
        for pos in targets {
            let Some(component) = self.controllers.get_mut(&pos) else {
                continue;
            };
            let transition = event(component, &mut self.store);
            component.apply(transition, world, self.events.as_ref());
            if transition != Transition::Unchanged {
                out.push((pos, transition));
            }
        }
        out
    }
}

impl Default for MultiblockManager {
    fn default() -> Self {
        Self::new(MultiblockConfig::default())
    }
}

fn index_restored(store: &mut StructureCacheStore, component: &ControllerComponent) {
    if let Err(StoreError::PositionClaimed { pos, owner }) = store.add_mapping(component.state()) {
        tracing::warn!(
            controller = %component.pos(),
            %pos,
            %owner,
            "saved structure overlaps another controller"
        );
    }
}
