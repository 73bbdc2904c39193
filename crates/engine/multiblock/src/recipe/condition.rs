//! Environmental requirements a recipe checks before it may run

use super::Recipe;
use crate::pos::BlockPos;
use crate::world::World;
use std::fmt;

/// What a condition may inspect
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    pub world: &'a dyn World,
    pub controller: BlockPos,
}

impl<'a> ConditionContext<'a> {
    pub fn new(world: &'a dyn World, controller: BlockPos) -> Self {
        Self { world, controller }
    }
}

impl fmt::Debug for ConditionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionContext")
            .field("dimension", &self.world.dimension())
            .field("controller", &self.controller)
            .finish()
    }
}

/// A recipe requirement.
///
/// Conditions split into an AND group, where every condition must hold, and
/// an OR group, where at least one must hold when the group is not empty.
pub trait RecipeCondition: fmt::Debug + Send + Sync {
    /// Stable identifier of the condition type
    fn kind(&self) -> &'static str;

    fn test(&self, recipe: &Recipe, ctx: &ConditionContext<'_>) -> bool;

    fn is_or(&self) -> bool {
        false
    }

    /// Invert the result of [`RecipeCondition::test`]
    fn is_reverse(&self) -> bool {
        false
    }

    fn check(&self, recipe: &Recipe, ctx: &ConditionContext<'_>) -> bool {
        self.test(recipe, ctx) != self.is_reverse()
    }

    fn tooltip(&self) -> String {
        self.kind().to_string()
    }
}

/// Flags every stock condition carries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Flags {
    or: bool,
    reverse: bool,
}

/// Requires the controller to be in a named dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionCondition {
    dimension: String,
    flags: Flags,
}

impl DimensionCondition {
    pub fn new(dimension: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            flags: Flags::default(),
        }
    }

    pub fn reversed(mut self) -> Self {
        self.flags.reverse = true;
        self
    }

    /// Move the condition into the OR group
    pub fn or(mut self) -> Self {
        self.flags.or = true;
        self
    }
}

impl RecipeCondition for DimensionCondition {
    fn kind(&self) -> &'static str {
        "dimension"
    }

    fn test(&self, _recipe: &Recipe, ctx: &ConditionContext<'_>) -> bool {
        ctx.world.dimension() == self.dimension
    }

    fn is_or(&self) -> bool {
        self.flags.or
    }

    fn is_reverse(&self) -> bool {
        self.flags.reverse
    }

    fn tooltip(&self) -> String {
        format!("dimension: {}", self.dimension)
    }
}

/// Requires the controller to stand in a named biome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BiomeCondition {
    biome: String,
    flags: Flags,
}

impl BiomeCondition {
    pub fn new(biome: impl Into<String>) -> Self {
        Self {
            biome: biome.into(),
            flags: Flags::default(),
        }
    }

    pub fn reversed(mut self) -> Self {
        self.flags.reverse = true;
        self
    }

    pub fn or(mut self) -> Self {
        self.flags.or = true;
        self
    }
}

impl RecipeCondition for BiomeCondition {
    fn kind(&self) -> &'static str {
        "biome"
    }

    fn test(&self, _recipe: &Recipe, ctx: &ConditionContext<'_>) -> bool {
        ctx.world.biome(ctx.controller).as_deref() == Some(self.biome.as_str())
    }

    fn is_or(&self) -> bool {
        self.flags.or
    }

    fn is_reverse(&self) -> bool {
        self.flags.reverse
    }

    fn tooltip(&self) -> String {
        format!("biome: {}", self.biome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::GridWorld;

    #[test]
    fn test_dimension_condition() {
        let world = GridWorld::new("nether");
        let ctx = ConditionContext::new(&world, BlockPos::ORIGIN);
        let recipe = Recipe::builder("check").build();

        assert!(DimensionCondition::new("nether").check(&recipe, &ctx));
        assert!(!DimensionCondition::new("overworld").check(&recipe, &ctx));
        assert!(DimensionCondition::new("overworld").reversed().check(&recipe, &ctx));
    }

    #[test]
    fn test_biome_condition() {
        let world = GridWorld::default().with_biome("desert");
        let ctx = ConditionContext::new(&world, BlockPos::ORIGIN);
        let recipe = Recipe::builder("check").build();

        assert!(BiomeCondition::new("desert").check(&recipe, &ctx));
        assert!(!BiomeCondition::new("plains").check(&recipe, &ctx));
        assert!(BiomeCondition::new("plains").or().is_or());
        assert_eq!(BiomeCondition::new("plains").tooltip(), "biome: plains");
    }
}
