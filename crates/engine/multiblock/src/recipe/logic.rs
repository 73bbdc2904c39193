//! Recipe driver ticked by formed controllers

use super::condition::ConditionContext;
use super::map::{can_start, RecipeMap};
use super::recipe::Recipe;
use crate::capability::{Io, ProxyTable};
use rand::Rng;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeStatus {
    /// Looking for a recipe every search interval
    #[default]
    Idle,
    /// Running a recipe
    Working,
    /// Running a recipe whose per-tick contents could not be handled
    Suspend,
}

impl fmt::Display for RecipeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeStatus::Idle => write!(f, "idle"),
            RecipeStatus::Working => write!(f, "working"),
            RecipeStatus::Suspend => write!(f, "suspend"),
        }
    }
}

/// Drives one controller through search, setup, per-tick work and finish.
///
/// The owner must only call [`RecipeLogic::tick`] while the structure is
/// formed and call [`RecipeLogic::invalidate`] when it stops being formed.
#[derive(Debug, Clone)]
pub struct RecipeLogic {
    status: RecipeStatus,
    last_recipe: Option<Arc<Recipe>>,
    progress: u32,
    duration: u32,
    timer: u64,
    search_interval: u32,
    completed: u64,
}

impl RecipeLogic {
    pub fn new(search_interval: u32) -> Self {
        Self {
            status: RecipeStatus::Idle,
            last_recipe: None,
            progress: 0,
            duration: 0,
            timer: 0,
            search_interval: search_interval.max(1),
            completed: 0,
        }
    }

    pub fn status(&self) -> RecipeStatus {
        self.status
    }

    pub fn is_working(&self) -> bool {
        self.status == RecipeStatus::Working
    }

    pub fn is_idle(&self) -> bool {
        self.status == RecipeStatus::Idle
    }

    pub fn is_suspend(&self) -> bool {
        self.status == RecipeStatus::Suspend
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn duration(&self) -> u32 {
        self.duration
    }

    /// Progress in `[0, 1]`
    pub fn progress_fraction(&self) -> f32 {
        if self.duration == 0 {
            0.0
        } else {
            self.progress as f32 / self.duration as f32
        }
    }

    /// Recipe currently or most recently run
    pub fn last_recipe(&self) -> Option<&Arc<Recipe>> {
        self.last_recipe.as_ref()
    }

    /// Number of recipes run to completion
    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        map: &RecipeMap,
        table: &mut ProxyTable,
        ctx: &ConditionContext<'_>,
        rng: &mut R,
    ) {
        match self.status {
            RecipeStatus::Idle => {
                self.timer += 1;
                if self.timer % u64::from(self.search_interval) == 0 {
                    self.find_and_setup(map, table, ctx, rng);
                }
            }
            RecipeStatus::Working | RecipeStatus::Suspend => self.work(map, table, ctx, rng),
        }
    }

    /// Drop the running recipe without producing anything
    pub fn invalidate(&mut self) {
        if self.status != RecipeStatus::Idle {
            tracing::debug!(
                recipe = self.last_recipe.as_deref().map(Recipe::uid),
                progress = self.progress,
                "recipe cancelled"
            );
        }
        self.status = RecipeStatus::Idle;
        self.progress = 0;
        self.duration = 0;
        self.timer = 0;
    }

    fn find_and_setup<R: Rng + ?Sized>(
        &mut self,
        map: &RecipeMap,
        table: &mut ProxyTable,
        ctx: &ConditionContext<'_>,
        rng: &mut R,
    ) {
        let recipe = match &self.last_recipe {
            Some(last) if can_start(last, table, ctx) => Some(last.clone()),
            _ => map.search_recipe(table, ctx),
        };
        if let Some(recipe) = recipe {
            self.setup(recipe, table, rng);
        }
    }

    fn setup<R: Rng + ?Sized>(&mut self, recipe: Arc<Recipe>, table: &mut ProxyTable, rng: &mut R) {
        recipe.pre_working(table);
        if !recipe.handle_recipe_io(Io::In, table, rng) {
            recipe.post_working(table);
            return;
        }
        tracing::debug!(recipe = recipe.uid(), holder = %table.owner(), "recipe started");
        self.status = RecipeStatus::Working;
        self.progress = 0;
        self.duration = recipe.duration();
        self.last_recipe = Some(recipe);
    }

    fn work<R: Rng + ?Sized>(
        &mut self,
        map: &RecipeMap,
        table: &mut ProxyTable,
        ctx: &ConditionContext<'_>,
        rng: &mut R,
    ) {
        let Some(recipe) = self.last_recipe.clone() else {
            self.invalidate();
            return;
        };

        if recipe.has_tick() {
            let handled = recipe.match_tick_recipe(table)
                && recipe.handle_tick_recipe_io(Io::In, table, rng)
                && recipe.handle_tick_recipe_io(Io::Out, table, rng);
            if !handled {
                if self.status != RecipeStatus::Suspend {
                    tracing::debug!(recipe = recipe.uid(), holder = %table.owner(), "recipe suspended");
                }
                self.status = RecipeStatus::Suspend;
                return;
            }
            self.status = RecipeStatus::Working;
        }

        self.progress += 1;
        if self.progress >= self.duration {
            self.finish(&recipe, table, rng);
            // chain straight into the same recipe when it can run again
            if can_start(&recipe, table, ctx) {
                self.setup(recipe, table, rng);
            } else {
                self.timer = 0;
                self.find_and_setup(map, table, ctx, rng);
            }
        }
    }

    fn finish<R: Rng + ?Sized>(&mut self, recipe: &Recipe, table: &mut ProxyTable, rng: &mut R) {
        recipe.handle_recipe_io(Io::Out, table, rng);
        recipe.post_working(table);
        self.completed += 1;
        self.status = RecipeStatus::Idle;
        self.progress = 0;
        self.duration = 0;
        tracing::debug!(recipe = recipe.uid(), holder = %table.owner(), "recipe finished");
    }
}

impl Default for RecipeLogic {
    fn default() -> Self {
        Self::new(5)
    }
}
