//! Saved structure caches
//!
//! Only the member cache of each controller is persisted. Everything else is
//! rederived by validating again after load.

use crate::pos::BlockPos;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
    #[error("structure file missing")]
    NotFound,
}

/// Member caches keyed by controller position.
///
/// Positions are stored packed (see [`BlockPos::as_long`]) in a
/// count-prefixed list per controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedStructures {
    caches: BTreeMap<BlockPos, Vec<i64>>,
}

impl SavedStructures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, controller: BlockPos, cache: &HashSet<BlockPos>) {
        let mut packed: Vec<i64> = cache.iter().map(|pos| pos.as_long()).collect();
        packed.sort_unstable();
        self.caches.insert(controller, packed);
    }

    pub fn get(&self, controller: BlockPos) -> Option<HashSet<BlockPos>> {
        self.caches
            .get(&controller)
            .map(|packed| packed.iter().map(|&long| BlockPos::from_long(long)).collect())
    }

    pub fn remove(&mut self, controller: BlockPos) -> Option<HashSet<BlockPos>> {
        self.caches
            .remove(&controller)
            .map(|packed| packed.into_iter().map(BlockPos::from_long).collect())
    }

    pub fn controllers(&self) -> impl Iterator<Item = BlockPos> + '_ {
        self.caches.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>, PersistError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, PersistError> {
        Ok(bincode::deserialize(bytes)?)
    }
}

/// Backend persisting [`SavedStructures`] for one world
pub trait StructureStorage {
    fn save(&self, structures: &SavedStructures) -> Result<(), PersistError>;
    fn load(&self) -> Result<SavedStructures, PersistError>;
}

/// Single-file backend; writes go through a temporary file and a rename
#[derive(Debug, Clone)]
pub struct FileStructureStorage {
    path: PathBuf,
}

impl FileStructureStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StructureStorage for FileStructureStorage {
    fn save(&self, structures: &SavedStructures) -> Result<(), PersistError> {
        let data = structures.encode()?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, data)?;
        fs::rename(tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), controllers = structures.len(), "structures saved");
        Ok(())
    }

    fn load(&self) -> Result<SavedStructures, PersistError> {
        match fs::read(&self.path) {
            Ok(bytes) => SavedStructures::decode(&bytes),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(PersistError::NotFound),
            Err(err) => Err(PersistError::Io(err)),
        }
    }
}
