//! Controller component: formation state, capability proxies and recipe driver

use crate::capability::ProxyTable;
use crate::config::MultiblockConfig;
use crate::events::StructureEvents;
use crate::pattern::BlockPattern;
use crate::pos::BlockPos;
use crate::recipe::{ConditionContext, RecipeLogic, RecipeMap, RecipeStatus};
use crate::state::{MultiblockState, Transition};
use crate::world::World;
use rand::Rng;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// Renderer ids a controller switches between
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Renderers {
    pub base: Option<String>,
    pub formed: Option<String>,
    pub working: Option<String>,
}

/// Shared, immutable description of a controller type
#[derive(Debug, Clone)]
pub struct ControllerDefinition {
    pub id: String,
    pub pattern: Arc<BlockPattern>,
    pub recipe_map: Arc<RecipeMap>,
    /// Tick regardless of whether the structure's chunks are loaded
    pub always_update: bool,
    pub renderers: Renderers,
}

impl ControllerDefinition {
    pub fn new(id: impl Into<String>, pattern: BlockPattern, recipe_map: RecipeMap) -> Self {
        Self {
            id: id.into(),
            pattern: Arc::new(pattern),
            recipe_map: Arc::new(recipe_map),
            always_update: false,
            renderers: Renderers::default(),
        }
    }

    pub fn always_update(mut self) -> Self {
        self.always_update = true;
        self
    }

    pub fn with_renderers(mut self, renderers: Renderers) -> Self {
        self.renderers = renderers;
        self
    }

    fn renderer_for(&self, status: ControllerStatus) -> &str {
        let base = self.renderers.base.as_deref().unwrap_or(&self.id);
        let formed = self.renderers.formed.as_deref().unwrap_or(base);
        match status {
            ControllerStatus::Unformed => base,
            ControllerStatus::Idle | ControllerStatus::Suspend => formed,
            ControllerStatus::Working => self.renderers.working.as_deref().unwrap_or(formed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    Unformed,
    Idle,
    Working,
    Suspend,
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerStatus::Unformed => write!(f, "unformed"),
            ControllerStatus::Idle => write!(f, "idle"),
            ControllerStatus::Working => write!(f, "working"),
            ControllerStatus::Suspend => write!(f, "suspend"),
        }
    }
}

/// Runtime side of a controller placed in the world
#[derive(Debug)]
pub struct ControllerComponent {
    definition: Arc<ControllerDefinition>,
    state: MultiblockState,
    proxies: ProxyTable,
    recipe_logic: RecipeLogic,
    parts: BTreeSet<BlockPos>,
    renderer: String,
}

impl ControllerComponent {
    pub fn new(pos: BlockPos, definition: Arc<ControllerDefinition>, config: &MultiblockConfig) -> Self {
        let state = MultiblockState::new(pos, definition.pattern.clone(), definition.always_update);
        let renderer = definition.renderer_for(ControllerStatus::Unformed).to_string();
        Self {
            state,
            proxies: ProxyTable::new(pos),
            recipe_logic: RecipeLogic::new(config.recipe_search_interval),
            parts: BTreeSet::new(),
            renderer,
            definition,
        }
    }

    pub fn pos(&self) -> BlockPos {
        self.state.controller_pos()
    }

    pub fn definition(&self) -> &Arc<ControllerDefinition> {
        &self.definition
    }

    pub fn state(&self) -> &MultiblockState {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut MultiblockState {
        &mut self.state
    }

    pub fn proxies(&self) -> &ProxyTable {
        &self.proxies
    }

    pub fn recipe_logic(&self) -> &RecipeLogic {
        &self.recipe_logic
    }

    /// Matched machine parts of the formed structure
    pub fn parts(&self) -> &BTreeSet<BlockPos> {
        &self.parts
    }

    pub fn is_formed(&self) -> bool {
        self.state.is_formed()
    }

    pub fn status(&self) -> ControllerStatus {
        if !self.state.is_formed() {
            return ControllerStatus::Unformed;
        }
        match self.recipe_logic.status() {
            RecipeStatus::Idle => ControllerStatus::Idle,
            RecipeStatus::Working => ControllerStatus::Working,
            RecipeStatus::Suspend => ControllerStatus::Suspend,
        }
    }

    /// Renderer currently selected for this controller
    pub fn renderer(&self) -> &str {
        &self.renderer
    }

    /// React to a lifecycle transition of the formation state
    pub fn apply(&mut self, transition: Transition, world: &dyn World, events: &dyn StructureEvents) {
        match transition {
            Transition::Unchanged => {}
            Transition::Formed | Transition::Refreshed => {
                self.on_structure_formed(world, events);
                if transition == Transition::Formed {
                    events.structure_formed(self.pos());
                }
            }
            Transition::Suspended => {
                self.proxies.clear();
            }
            Transition::Invalidated | Transition::Destroyed => self.on_structure_invalid(events),
        }
        self.update_renderer(events);
    }

    /// Release proxies and cancel the recipe when the controller goes away
    pub fn tear_down(&mut self, events: &dyn StructureEvents) {
        self.on_structure_invalid(events);
        self.update_renderer(events);
    }

    /// Advance the recipe driver by one tick; does nothing while unformed
    pub fn tick<R: Rng + ?Sized>(&mut self, world: &dyn World, events: &dyn StructureEvents, rng: &mut R) {
        if !self.state.is_formed() {
            return;
        }
        let ctx = ConditionContext::new(world, self.pos());
        self.recipe_logic
            .tick(&self.definition.recipe_map, &mut self.proxies, &ctx, rng);
        self.update_renderer(events);
    }

    fn on_structure_formed(&mut self, world: &dyn World, events: &dyn StructureEvents) {
        let pos = self.pos();
        self.proxies
            .rebuild(self.state.context().capability_slots(), world, events);

        let parts = self.state.context().parts();
        for removed in self.parts.difference(&parts) {
            events.part_removed(pos, *removed);
        }
        for added in parts.difference(&self.parts) {
            events.part_added(pos, *added);
        }
        self.parts = parts;
    }

    fn on_structure_invalid(&mut self, events: &dyn StructureEvents) {
        let pos = self.pos();
        self.recipe_logic.invalidate();
        self.proxies.clear();
        for part in std::mem::take(&mut self.parts) {
            events.part_removed(pos, part);
        }
        events.structure_invalid(pos);
    }

    fn update_renderer(&mut self, events: &dyn StructureEvents) {
        let chosen = self.definition.renderer_for(self.status());
        let renderer = events
            .update_renderer(self.pos(), chosen)
            .unwrap_or_else(|| chosen.to_string());
        if renderer != self.renderer {
            tracing::trace!(controller = %self.pos(), %renderer, "renderer changed");
            self.renderer = renderer;
        }
    }
}
