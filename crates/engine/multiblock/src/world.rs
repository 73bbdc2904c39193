//! World query surface consumed by the structure engine

use crate::capability::{Capability, CapabilityProxy, Io, SharedStorage, StorageProxy};
use crate::pos::{BlockPos, ChunkPos};
use std::collections::{HashMap, HashSet};

/// Block id of empty space
pub const AIR: &str = "air";

/// Snapshot of whatever occupies a single cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occupant {
    /// Block registry id
    pub block: String,
    /// Component definition id when the cell holds a machine component
    pub component: Option<String>,
    /// Capabilities the occupant exposes
    pub capabilities: Vec<Capability>,
}

impl Occupant {
    pub fn air() -> Self {
        Self::block(AIR)
    }

    pub fn block(id: impl Into<String>) -> Self {
        Self {
            block: id.into(),
            component: None,
            capabilities: Vec::new(),
        }
    }

    /// A component cell; the block id doubles as the component id
    pub fn component(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            block: id.clone(),
            component: Some(id),
            capabilities: Vec::new(),
        }
    }

    pub fn with_capability(mut self, capability: Capability) -> Self {
        if !self.capabilities.contains(&capability) {
            self.capabilities.push(capability);
        }
        self
    }

    pub fn is_air(&self) -> bool {
        self.block == AIR
    }

    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

impl Default for Occupant {
    fn default() -> Self {
        Self::air()
    }
}

/// Read access to the voxel world.
///
/// The engine never writes to the world; contents move only through proxies
/// handed out by [`World::create_proxy`].
pub trait World {
    fn is_loaded(&self, pos: BlockPos) -> bool;

    fn occupant(&self, pos: BlockPos) -> Occupant;

    /// Dimension name, used for logging and recipe conditions
    fn dimension(&self) -> &str {
        "overworld"
    }

    fn biome(&self, _pos: BlockPos) -> Option<String> {
        None
    }

    /// Bind a proxy to the capability a member exposes
    fn create_proxy(
        &self,
        _pos: BlockPos,
        _capability: &Capability,
        _io: Io,
    ) -> Option<Box<dyn CapabilityProxy>> {
        None
    }
}

/// In-memory world backed by a hash map of cells.
///
/// Cells that were never set are air. Every chunk is loaded unless
/// explicitly unloaded.
#[derive(Debug)]
pub struct GridWorld {
    dimension: String,
    biome: Option<String>,
    cells: HashMap<BlockPos, Occupant>,
    storages: HashMap<(BlockPos, Capability), SharedStorage>,
    unloaded: HashSet<ChunkPos>,
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new("overworld")
    }
}

impl GridWorld {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            biome: None,
            cells: HashMap::new(),
            storages: HashMap::new(),
            unloaded: HashSet::new(),
        }
    }

    pub fn with_biome(mut self, biome: impl Into<String>) -> Self {
        self.biome = Some(biome.into());
        self
    }

    pub fn set(&mut self, pos: BlockPos, occupant: Occupant) {
        if occupant.is_air() && occupant.component.is_none() {
            self.remove(pos);
        } else {
            self.cells.insert(pos, occupant);
        }
    }

    /// Clear a cell back to air, dropping any attached storage
    pub fn remove(&mut self, pos: BlockPos) -> Option<Occupant> {
        self.storages.retain(|(at, _), _| *at != pos);
        self.cells.remove(&pos)
    }

    /// Set every cell in the inclusive box `[min, max]`
    pub fn fill(&mut self, min: BlockPos, max: BlockPos, occupant: &Occupant) {
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                for z in min.z..=max.z {
                    self.set(BlockPos::new(x, y, z), occupant.clone());
                }
            }
        }
    }

    /// Attach storage to the cell, exposing `capability` there
    pub fn attach_storage(&mut self, pos: BlockPos, capability: Capability, storage: SharedStorage) {
        let occupant = self.cells.entry(pos).or_default();
        if !occupant.has_capability(&capability) {
            occupant.capabilities.push(capability.clone());
        }
        self.storages.insert((pos, capability), storage);
    }

    pub fn storage(&self, pos: BlockPos, capability: &Capability) -> Option<SharedStorage> {
        self.storages.get(&(pos, capability.clone())).cloned()
    }

    pub fn storages(&self) -> impl Iterator<Item = (BlockPos, &Capability, &SharedStorage)> {
        self.storages.iter().map(|((pos, cap), storage)| (*pos, cap, storage))
    }

    pub fn unload_chunk(&mut self, chunk: ChunkPos) {
        self.unloaded.insert(chunk);
    }

    pub fn load_chunk(&mut self, chunk: ChunkPos) {
        self.unloaded.remove(&chunk);
    }

    /// Chunk columns containing at least one non-air cell
    pub fn occupied_chunks(&self) -> HashSet<ChunkPos> {
        self.cells.keys().map(|pos| pos.chunk()).collect()
    }
}

impl World for GridWorld {
    fn is_loaded(&self, pos: BlockPos) -> bool {
        !self.unloaded.contains(&pos.chunk())
    }

    fn occupant(&self, pos: BlockPos) -> Occupant {
        self.cells.get(&pos).cloned().unwrap_or_default()
    }

    fn dimension(&self) -> &str {
        &self.dimension
    }

    fn biome(&self, _pos: BlockPos) -> Option<String> {
        self.biome.clone()
    }

    fn create_proxy(
        &self,
        pos: BlockPos,
        capability: &Capability,
        _io: Io,
    ) -> Option<Box<dyn CapabilityProxy>> {
        let storage = self.storage(pos, capability)?;
        Some(Box::new(StorageProxy::new(capability.clone(), pos, storage)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::ResourceStorage;

    #[test]
    fn test_unset_cells_are_air() {
        let world = GridWorld::default();
        assert!(world.occupant(BlockPos::new(3, 3, 3)).is_air());
        assert!(world.is_loaded(BlockPos::new(3, 3, 3)));
    }

    #[test]
    fn test_unload_chunk() {
        let mut world = GridWorld::default();
        world.unload_chunk(ChunkPos::new(1, 0));
        assert!(!world.is_loaded(BlockPos::new(17, 0, 3)));
        assert!(world.is_loaded(BlockPos::new(15, 0, 3)));
        world.load_chunk(ChunkPos::new(1, 0));
        assert!(world.is_loaded(BlockPos::new(17, 0, 3)));
    }

    #[test]
    fn test_storage_exposes_capability_and_proxy() {
        let mut world = GridWorld::default();
        let pos = BlockPos::new(1, 0, 0);
        world.set(pos, Occupant::component("mbd:item_hatch"));
        world.attach_storage(pos, Capability::ITEM, ResourceStorage::new(16).shared());

        assert!(world.occupant(pos).has_capability(&Capability::ITEM));
        assert!(world.create_proxy(pos, &Capability::ITEM, Io::In).is_some());
        assert!(world.create_proxy(pos, &Capability::FLUID, Io::In).is_none());

        world.remove(pos);
        assert!(world.create_proxy(pos, &Capability::ITEM, Io::In).is_none());
    }
}
