//! Drive a loaded scenario through the structure manager

use crate::scenario::Scenario;
use anyhow::{anyhow, Result};
use multiblock::{
    BlockPos, ChunkPos, ControllerStatus, FileStructureStorage, MultiblockManager, StructureEvents,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Manager ticks to run after the initial validation
    pub ticks: u64,
    /// Seed for chanced recipe contents
    pub seed: u64,
    /// Restore structure caches from this file before validating
    pub load: Option<PathBuf>,
    /// Write structure caches to this file after the last tick
    pub save: Option<PathBuf>,
}

/// Reports structure lifecycle changes through tracing
struct LogEvents;

impl StructureEvents for LogEvents {
    fn structure_formed(&self, controller: BlockPos) {
        tracing::info!(%controller, "structure formed");
    }

    fn structure_invalid(&self, controller: BlockPos) {
        tracing::info!(%controller, "structure invalidated");
    }

    fn part_added(&self, controller: BlockPos, part: BlockPos) {
        tracing::debug!(%controller, %part, "part added");
    }

    fn part_removed(&self, controller: BlockPos, part: BlockPos) {
        tracing::debug!(%controller, %part, "part removed");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageReport {
    pub pos: BlockPos,
    pub capability: String,
    pub contents: Vec<(String, u64)>,
}

impl StorageReport {
    pub fn amount(&self, id: &str) -> u64 {
        self.contents
            .iter()
            .find(|(held, _)| held == id)
            .map_or(0, |(_, amount)| *amount)
    }
}

/// Outcome of a scenario run
#[derive(Debug, Clone)]
pub struct Report {
    pub controller: BlockPos,
    pub status: ControllerStatus,
    /// Why the structure is not formed
    pub error: Option<String>,
    pub members: usize,
    pub parts: usize,
    pub proxies: usize,
    pub renderer: String,
    pub completed: u64,
    pub ticks: u64,
    pub storages: Vec<StorageReport>,
}

impl Report {
    pub fn is_formed(&self) -> bool {
        self.status != ControllerStatus::Unformed
    }

    pub fn storage(&self, pos: BlockPos, capability: &str) -> Option<&StorageReport> {
        self.storages
            .iter()
            .find(|s| s.pos == pos && s.capability == capability)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "controller {}: {}", self.controller, self.status)?;
        if let Some(error) = &self.error {
            writeln!(f, "  error: {error}")?;
        }
        writeln!(
            f,
            "  members: {}, parts: {}, proxies: {}",
            self.members, self.parts, self.proxies
        )?;
        writeln!(f, "  renderer: {}", self.renderer)?;
        writeln!(f, "  recipes completed: {} in {} ticks", self.completed, self.ticks)?;
        for storage in &self.storages {
            write!(f, "  {} {}:", storage.capability, storage.pos)?;
            if storage.contents.is_empty() {
                write!(f, " empty")?;
            }
            for (id, amount) in &storage.contents {
                write!(f, " {id}={amount}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Validate the scenario's controller, tick it and collect a report
pub fn run(scenario: Scenario, options: &RunOptions) -> Result<Report> {
    let Scenario {
        config,
        controller,
        definition,
        world,
    } = scenario;

    let mut manager = MultiblockManager::new(config).with_events(LogEvents);
    if let Some(path) = &options.load {
        manager.load_from(&FileStructureStorage::new(path))?;
    }
    manager.add_controller(controller, definition);

    let mut chunks: BTreeSet<ChunkPos> = world.occupied_chunks().into_iter().collect();
    chunks.insert(controller.chunk());
    for chunk in chunks {
        for (pos, transition) in manager.on_chunk_load(chunk, &world) {
            tracing::debug!(controller = %pos, %chunk, ?transition, "chunk loaded");
        }
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    for _ in 0..options.ticks {
        manager.tick(&world, &mut rng);
    }

    if let Some(path) = &options.save {
        manager.save_to(&FileStructureStorage::new(path))?;
        tracing::info!(path = %path.display(), "structure caches saved");
    }

    let component = manager
        .controller(controller)
        .ok_or_else(|| anyhow!("controller {controller} is not registered"))?;

    let mut storages: Vec<StorageReport> = world
        .storages()
        .map(|(pos, capability, storage)| StorageReport {
            pos,
            capability: capability.name().to_string(),
            contents: storage
                .borrow()
                .contents()
                .map(|(id, amount)| (id.to_string(), amount))
                .collect(),
        })
        .collect();
    storages.sort_by(|a, b| (a.pos, &a.capability).cmp(&(b.pos, &b.capability)));

    Ok(Report {
        controller,
        status: component.status(),
        error: component.state().error().map(ToString::to_string),
        members: component.state().cache().len(),
        parts: component.parts().len(),
        proxies: component.proxies().len(),
        renderer: component.renderer().to_string(),
        completed: component.recipe_logic().completed(),
        ticks: manager.ticks(),
        storages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FURNACE: &str = include_str!("../scenarios/furnace.kdl");
    const BOILER: &str = include_str!("../scenarios/boiler.kdl");

    fn options(ticks: u64) -> RunOptions {
        RunOptions {
            ticks,
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_furnace_smelts_all_sand() {
        let scenario = Scenario::from_string(FURNACE).unwrap();
        let report = run(scenario, &options(10)).unwrap();

        assert!(report.is_formed());
        assert_eq!(report.error, None);
        assert_eq!(report.members, 4);
        assert_eq!(report.parts, 2);
        assert_eq!(report.completed, 2);
        assert_eq!(report.status, ControllerStatus::Idle);
        assert_eq!(report.renderer, "furnace");

        let input = report.storage(BlockPos::new(-1, 64, 0), "item").unwrap();
        assert_eq!(input.amount("sand"), 0);
        let output = report.storage(BlockPos::new(1, 64, 0), "item").unwrap();
        assert_eq!(output.amount("glass"), 2);
    }

    #[test]
    fn test_furnace_mid_recipe() {
        let scenario = Scenario::from_string(FURNACE).unwrap();
        let report = run(scenario, &options(1)).unwrap();

        assert_eq!(report.status, ControllerStatus::Working);
        assert_eq!(report.renderer, "furnace_lit");
        assert_eq!(report.completed, 0);
        assert!(report.to_string().contains("controller (0, 64, 0): working"));
    }

    #[test]
    fn test_missing_member_reports_error() {
        let broken = FURNACE.replace(r#"block "mbd:casing" 0 64 1"#, "");
        let scenario = Scenario::from_string(&broken).unwrap();
        let report = run(scenario, &options(3)).unwrap();

        assert!(!report.is_formed());
        assert!(report.error.is_some());
        assert_eq!(report.completed, 0);
        assert_eq!(report.renderer, "furnace");
        assert!(report.to_string().contains("error:"));
    }

    #[test]
    fn test_boiler_burns_coal() {
        let scenario = Scenario::from_string(BOILER).unwrap();
        let report = run(scenario, &options(5)).unwrap();

        assert!(report.is_formed(), "{report}");
        assert_eq!(report.parts, 2);
        let coal = report.storage(BlockPos::new(-1, 0, 0), "item").unwrap();
        assert_eq!(coal.amount("coal"), 7);
    }

    #[test]
    fn test_saved_caches_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("structures.bin");

        let scenario = Scenario::from_string(FURNACE).unwrap();
        let saved = RunOptions {
            save: Some(path.clone()),
            ..RunOptions::default()
        };
        run(scenario, &saved).unwrap();
        assert!(path.exists());

        let scenario = Scenario::from_string(FURNACE).unwrap();
        let loaded = RunOptions {
            load: Some(path),
            ..RunOptions::default()
        };
        let report = run(scenario, &loaded).unwrap();
        assert!(report.is_formed());
        assert_eq!(report.members, 4);
    }
}
