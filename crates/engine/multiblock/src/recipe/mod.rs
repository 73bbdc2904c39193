//! Recipes, their conditions, and the driver that runs them

mod condition;
mod content;
mod logic;
mod map;
#[allow(clippy::module_inception)]
mod recipe;

pub use condition::{BiomeCondition, ConditionContext, DimensionCondition, RecipeCondition};
pub use content::{Content, Ingredient};
pub use logic::{RecipeLogic, RecipeStatus};
pub use map::{can_start, RecipeMap};
pub use recipe::{Contents, Recipe, RecipeBuilder};
