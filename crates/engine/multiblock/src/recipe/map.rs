//! Named recipe collections and recipe lookup

use super::condition::ConditionContext;
use super::recipe::Recipe;
use crate::capability::ProxyTable;
use std::sync::Arc;

/// Named, ordered collection of recipes a controller may run
#[derive(Debug, Clone, Default)]
pub struct RecipeMap {
    name: String,
    recipes: Vec<Arc<Recipe>>,
}

impl RecipeMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recipes: Vec::new(),
        }
    }

    pub fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.add(recipe);
        self
    }

    /// Register a recipe, replacing any recipe with the same uid in place
    pub fn add(&mut self, recipe: Recipe) {
        let recipe = Arc::new(recipe);
        match self.recipes.iter_mut().find(|r| r.uid() == recipe.uid()) {
            Some(slot) => *slot = recipe,
            None => self.recipes.push(recipe),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, uid: &str) -> Option<&Arc<Recipe>> {
        self.recipes.iter().find(|r| r.uid() == uid)
    }

    pub fn recipes(&self) -> impl Iterator<Item = &Arc<Recipe>> {
        self.recipes.iter()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// First recipe, in registration order, that can start right now
    pub fn search_recipe(&self, table: &ProxyTable, ctx: &ConditionContext<'_>) -> Option<Arc<Recipe>> {
        self.recipes
            .iter()
            .find(|recipe| can_start(recipe, table, ctx))
            .cloned()
    }
}

/// Conditions hold and every content list, per-tick ones included, can be satisfied
pub fn can_start(recipe: &Recipe, table: &ProxyTable, ctx: &ConditionContext<'_>) -> bool {
    recipe.check_conditions(ctx)
        && recipe.match_recipe(table)
        && (!recipe.has_tick() || recipe.match_tick_recipe(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, Io, ResourceStorage, StorageProxy};
    use crate::pos::BlockPos;
    use crate::recipe::DimensionCondition;
    use crate::world::GridWorld;

    #[test]
    fn test_search_returns_first_startable() {
        let storage = ResourceStorage::new(64).with("sand", 1).shared();
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        table.insert(Io::Both, Box::new(StorageProxy::new(Capability::ITEM, BlockPos::new(1, 0, 0), storage)));

        let map = RecipeMap::new("furnace")
            .with_recipe(Recipe::builder("glass_stack").input_item("sand", 8).build())
            .with_recipe(
                Recipe::builder("nether_glass")
                    .input_item("sand", 1)
                    .condition(DimensionCondition::new("nether"))
                    .build(),
            )
            .with_recipe(Recipe::builder("glass").input_item("sand", 1).output_item("glass", 1).build());

        let world = GridWorld::default();
        let ctx = ConditionContext::new(&world, BlockPos::ORIGIN);
        let found = map.search_recipe(&table, &ctx).map(|r| r.uid().to_string());
        assert_eq!(found.as_deref(), Some("glass"));
    }

    #[test]
    fn test_add_replaces_same_uid() {
        let mut map = RecipeMap::new("furnace");
        map.add(Recipe::builder("glass").duration(10).build());
        map.add(Recipe::builder("glass").duration(40).build());
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("glass").map(|r| r.duration()), Some(40));
    }
}
