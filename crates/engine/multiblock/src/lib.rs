//! Multiblock crate - structure matching and recipe processing for Crossworld
//!
//! A controller placed in the world checks that the cells around it match a
//! declared template. Once formed, the capabilities exposed by the matched
//! members are bound as proxies and recipes consume and produce through them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  MultiblockManager                       │
//! ├─────────────────────────────────────────────────────────┤
//! │  StructureCacheStore                                     │
//! │  ├── chunk -> controllers index                         │
//! │  └── member -> owner claims                             │
//! ├─────────────────────────────────────────────────────────┤
//! │  ControllerComponent (one per controller)               │
//! │  ├── MultiblockState (formation, cache, context)        │
//! │  ├── ProxyTable ((io, capability) -> proxies)           │
//! │  └── RecipeLogic (search, work, finish)                 │
//! ├─────────────────────────────────────────────────────────┤
//! │  BlockPattern                                            │
//! │  ├── TraceabilityPredicate per cell                     │
//! │  └── rotations / mirrors                                │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use multiblock::pattern::{BlockPattern, Predicate};
//! use multiblock::world::{GridWorld, Occupant};
//! use multiblock::{BlockPos, ChunkPos, ControllerDefinition, MultiblockManager, RecipeMap, Transition};
//! use std::sync::Arc;
//!
//! let pattern = BlockPattern::builder()
//!     .aisle(["CSC"])
//!     .symbol('C', Predicate::blocks(["mbd:casing"]))
//!     .symbol('S', Predicate::controller("mbd:furnace"))
//!     .build()
//!     .unwrap();
//! let definition = ControllerDefinition::new("mbd:furnace", pattern, RecipeMap::new("furnace"));
//!
//! let mut world = GridWorld::default();
//! world.set(BlockPos::new(0, 0, 0), Occupant::component("mbd:furnace"));
//! world.set(BlockPos::new(-1, 0, 0), Occupant::block("mbd:casing"));
//! world.set(BlockPos::new(1, 0, 0), Occupant::block("mbd:casing"));
//!
//! let mut manager = MultiblockManager::default();
//! manager.add_controller(BlockPos::new(0, 0, 0), Arc::new(definition));
//! let changes = manager.on_chunk_load(ChunkPos::new(0, 0), &world);
//! assert_eq!(changes, vec![(BlockPos::new(0, 0, 0), Transition::Formed)]);
//! ```

pub mod capability;
pub mod config;
pub mod controller;
pub mod events;
pub mod manager;
pub mod pattern;
pub mod persistence;
pub mod pos;
pub mod recipe;
pub mod state;
pub mod store;
pub mod value;
pub mod world;

pub use capability::{Capability, CapabilityProxy, Io, ProxyTable, ResourceStorage, StorageProxy};
pub use config::MultiblockConfig;
pub use controller::{ControllerComponent, ControllerDefinition, ControllerStatus, Renderers};
pub use events::{NoEvents, StructureEvents};
pub use manager::MultiblockManager;
pub use pattern::{BlockPattern, MatchContext, PatternBuildError, PatternError};
pub use persistence::{FileStructureStorage, PersistError, SavedStructures, StructureStorage};
pub use pos::{BlockPos, ChunkPos};
pub use recipe::{Content, Ingredient, Recipe, RecipeLogic, RecipeMap, RecipeStatus};
pub use state::{MultiblockState, Transition};
pub use store::{StoreError, StructureCacheStore};
pub use value::Value;
pub use world::{GridWorld, Occupant, World};
