//! Recipe declarations and their resolution against a proxy table

use super::condition::{ConditionContext, RecipeCondition};
use super::content::{Content, Ingredient};
use crate::capability::{Capability, CapabilityProxy, Io, ProxyTable};
use crate::pos::BlockPos;
use crate::value::Value;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::ops::ControlFlow;
use std::sync::Arc;

/// Content lists keyed by capability
pub type Contents = BTreeMap<Capability, Vec<Content>>;

/// Immutable recipe declaration. Build one with [`Recipe::builder`].
#[derive(Debug, Clone, Default)]
pub struct Recipe {
    uid: String,
    inputs: Contents,
    outputs: Contents,
    tick_inputs: Contents,
    tick_outputs: Contents,
    conditions: Vec<Arc<dyn RecipeCondition>>,
    data: BTreeMap<String, Value>,
    duration: u32,
    text: Vec<String>,
}

impl Recipe {
    pub fn builder(uid: impl Into<String>) -> RecipeBuilder {
        RecipeBuilder {
            recipe: Recipe {
                uid: uid.into(),
                duration: 100,
                ..Recipe::default()
            },
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Working time in ticks
    pub fn duration(&self) -> u32 {
        self.duration
    }

    pub fn data(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    pub fn text(&self) -> &[String] {
        &self.text
    }

    pub fn conditions(&self) -> &[Arc<dyn RecipeCondition>] {
        &self.conditions
    }

    pub fn inputs(&self) -> &Contents {
        &self.inputs
    }

    pub fn outputs(&self) -> &Contents {
        &self.outputs
    }

    pub fn tick_inputs(&self) -> &Contents {
        &self.tick_inputs
    }

    pub fn tick_outputs(&self) -> &Contents {
        &self.tick_outputs
    }

    pub fn has_tick(&self) -> bool {
        !self.tick_inputs.is_empty() || !self.tick_outputs.is_empty()
    }

    /// Every AND condition holds and, if any OR condition exists, one of them holds
    pub fn check_conditions(&self, ctx: &ConditionContext<'_>) -> bool {
        let (or, and): (Vec<_>, Vec<_>) = self.conditions.iter().partition(|c| c.is_or());
        and.iter().all(|c| c.check(self, ctx)) && (or.is_empty() || or.iter().any(|c| c.check(self, ctx)))
    }

    /// Whether the table could consume all inputs and accept all outputs.
    ///
    /// Nothing is mutated; chances are ignored.
    pub fn match_recipe(&self, table: &ProxyTable) -> bool {
        if !table.has_proxies() {
            return false;
        }
        self.match_contents(Io::In, &self.inputs, table) && self.match_contents(Io::Out, &self.outputs, table)
    }

    /// Same as [`Recipe::match_recipe`] for the per-tick contents
    pub fn match_tick_recipe(&self, table: &ProxyTable) -> bool {
        self.match_contents(Io::In, &self.tick_inputs, table)
            && self.match_contents(Io::Out, &self.tick_outputs, table)
    }

    /// Consume inputs (`Io::In`) or produce outputs (`Io::Out`).
    ///
    /// Entries below certainty are rolled independently. Capabilities handled
    /// before a failing one keep their effects.
    pub fn handle_recipe_io<R: Rng + ?Sized>(&self, io: Io, table: &mut ProxyTable, rng: &mut R) -> bool {
        let contents = match io {
            Io::In => &self.inputs,
            Io::Out => &self.outputs,
            Io::Both => return false,
        };
        self.handle_contents(io, contents, table, rng)
    }

    pub fn handle_tick_recipe_io<R: Rng + ?Sized>(&self, io: Io, table: &mut ProxyTable, rng: &mut R) -> bool {
        let contents = match io {
            Io::In => &self.tick_inputs,
            Io::Out => &self.tick_outputs,
            Io::Both => return false,
        };
        self.handle_contents(io, contents, table, rng)
    }

    /// Notify proxies right before the recipe starts working
    pub fn pre_working(&self, table: &mut ProxyTable) {
        self.notify(table, |proxy, holder, io, recipe| proxy.pre_working(holder, io, recipe));
    }

    /// Notify proxies right after the recipe finished working
    pub fn post_working(&self, table: &mut ProxyTable) {
        self.notify(table, |proxy, holder, io, recipe| proxy.post_working(holder, io, recipe));
    }

    fn match_contents(&self, io: Io, contents: &Contents, table: &ProxyTable) -> bool {
        contents.iter().all(|(capability, list)| {
            let mut left: Vec<Ingredient> = list.iter().map(|c| c.ingredient.clone()).collect();
            if left.is_empty() {
                return true;
            }
            let mut used = HashSet::new();
            for proxy in table.resolve(io, capability) {
                if !used.insert(proxy.pos()) {
                    continue;
                }
                left = proxy.search_recipe(io, self, left);
                if left.is_empty() {
                    break;
                }
            }
            left.is_empty()
        })
    }

    fn handle_contents<R: Rng + ?Sized>(
        &self,
        io: Io,
        contents: &Contents,
        table: &mut ProxyTable,
        rng: &mut R,
    ) -> bool {
        if !table.has_proxies() {
            return false;
        }
        for (capability, list) in contents {
            let mut left: Vec<Ingredient> = list
                .iter()
                .filter(|c| c.is_guaranteed() || rng.random::<f32>() < c.chance)
                .map(|c| c.ingredient.clone())
                .collect();
            if left.is_empty() {
                continue;
            }

            let mut used = HashSet::new();
            table.for_each_resolved_mut(io, capability, |proxy| {
                if !used.insert(proxy.pos()) {
                    return ControlFlow::Continue(());
                }
                left = proxy.handle_recipe(io, self, std::mem::take(&mut left));
                if left.is_empty() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });

            if !left.is_empty() {
                tracing::warn!(
                    recipe = %self.uid,
                    holder = %table.owner(),
                    %capability,
                    %io,
                    missing = ?left,
                    "recipe io could not be fully handled"
                );
                return false;
            }
        }
        true
    }

    fn notify<F>(&self, table: &mut ProxyTable, mut visit: F)
    where
        F: FnMut(&mut dyn CapabilityProxy, BlockPos, Io, &Recipe),
    {
        let holder = table.owner();
        let inputs: BTreeSet<&Capability> = self.inputs.keys().chain(self.tick_inputs.keys()).collect();
        let outputs: BTreeSet<&Capability> = self.outputs.keys().chain(self.tick_outputs.keys()).collect();

        for (io, capabilities) in [(Io::In, inputs), (Io::Out, outputs)] {
            for capability in capabilities {
                let direction = if table.contains(io, capability) { io } else { Io::Both };
                table.for_each_in_bucket_mut(direction, capability, |proxy| visit(proxy, holder, io, self));
            }
        }
    }
}

impl fmt::Display for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} ticks)", self.uid, self.duration)
    }
}

/// Builder for [`Recipe`]
#[derive(Debug)]
pub struct RecipeBuilder {
    recipe: Recipe,
}

impl RecipeBuilder {
    pub fn duration(mut self, ticks: u32) -> Self {
        self.recipe.duration = ticks;
        self
    }

    pub fn input(mut self, capability: Capability, content: Content) -> Self {
        self.recipe.inputs.entry(capability).or_default().push(content);
        self
    }

    pub fn output(mut self, capability: Capability, content: Content) -> Self {
        self.recipe.outputs.entry(capability).or_default().push(content);
        self
    }

    pub fn tick_input(mut self, capability: Capability, content: Content) -> Self {
        self.recipe.tick_inputs.entry(capability).or_default().push(content);
        self
    }

    pub fn tick_output(mut self, capability: Capability, content: Content) -> Self {
        self.recipe.tick_outputs.entry(capability).or_default().push(content);
        self
    }

    /// Shorthand for a guaranteed item input
    pub fn input_item(self, id: impl Into<String>, amount: u64) -> Self {
        self.input(Capability::ITEM, Content::new(Ingredient::new(id, amount)))
    }

    /// Shorthand for a guaranteed item output
    pub fn output_item(self, id: impl Into<String>, amount: u64) -> Self {
        self.output(Capability::ITEM, Content::new(Ingredient::new(id, amount)))
    }

    pub fn condition(mut self, condition: impl RecipeCondition + 'static) -> Self {
        self.recipe.conditions.push(Arc::new(condition));
        self
    }

    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.recipe.data.insert(key.into(), value.into());
        self
    }

    pub fn text(mut self, line: impl Into<String>) -> Self {
        self.recipe.text.push(line.into());
        self
    }

    pub fn build(self) -> Recipe {
        self.recipe
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ResourceStorage, SharedStorage, StorageProxy};
    use crate::recipe::{BiomeCondition, DimensionCondition};
    use crate::world::GridWorld;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table_with(entries: &[(Io, i32, SharedStorage)]) -> ProxyTable {
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        for (io, x, storage) in entries {
            let proxy = StorageProxy::new(Capability::ITEM, BlockPos::new(*x, 0, 0), storage.clone());
            table.insert(*io, Box::new(proxy));
        }
        table
    }

    fn smelt() -> Recipe {
        Recipe::builder("smelt_iron")
            .duration(20)
            .input_item("iron_ore", 2)
            .output_item("iron_ingot", 1)
            .build()
    }

    #[test]
    fn test_match_does_not_mutate() {
        let input = ResourceStorage::new(64).with("iron_ore", 2).shared();
        let output = ResourceStorage::new(64).shared();
        let table = table_with(&[(Io::In, 1, input.clone()), (Io::Out, 2, output.clone())]);

        assert!(smelt().match_recipe(&table));
        assert_eq!(input.borrow().amount("iron_ore"), 2);
        assert_eq!(output.borrow().total(), 0);
    }

    #[test]
    fn test_match_spans_proxies_and_both_bucket() {
        let first = ResourceStorage::new(64).with("iron_ore", 1).shared();
        let shared = ResourceStorage::new(64).with("iron_ore", 1).shared();
        let table = table_with(&[(Io::In, 1, first), (Io::Both, 2, shared)]);
        let recipe = Recipe::builder("two_ore").input_item("iron_ore", 2).build();
        assert!(recipe.match_recipe(&table));

        let recipe = Recipe::builder("three_ore").input_item("iron_ore", 3).build();
        assert!(!recipe.match_recipe(&table));
    }

    #[test]
    fn test_handle_consumes_and_produces() {
        let input = ResourceStorage::new(64).with("iron_ore", 5).shared();
        let output = ResourceStorage::new(64).shared();
        let mut table = table_with(&[(Io::In, 1, input.clone()), (Io::Out, 2, output.clone())]);
        let mut rng = StdRng::seed_from_u64(7);

        let recipe = smelt();
        assert!(recipe.handle_recipe_io(Io::In, &mut table, &mut rng));
        assert!(recipe.handle_recipe_io(Io::Out, &mut table, &mut rng));
        assert_eq!(input.borrow().amount("iron_ore"), 3);
        assert_eq!(output.borrow().amount("iron_ingot"), 1);
        assert!(!recipe.handle_recipe_io(Io::Both, &mut table, &mut rng));
    }

    #[test]
    fn test_handle_failure_keeps_partial_effects() {
        let items = ResourceStorage::new(64).with("iron_ore", 2).shared();
        let mut table = table_with(&[(Io::In, 1, items.clone())]);
        let recipe = Recipe::builder("hungry")
            .input_item("iron_ore", 2)
            .input(Capability::FLUID, Content::new(Ingredient::new("lava", 100)))
            .build();
        let mut rng = StdRng::seed_from_u64(1);

        assert!(!recipe.handle_recipe_io(Io::In, &mut table, &mut rng));
        // fluid is ordered before item, so nothing was consumed
        assert_eq!(items.borrow().amount("iron_ore"), 2);

        let recipe = Recipe::builder("hungry_late")
            .input_item("iron_ore", 2)
            .input(Capability::new("mbd:mana"), Content::new(Ingredient::new("mana", 1)))
            .build();
        assert!(!recipe.handle_recipe_io(Io::In, &mut table, &mut rng));
        assert_eq!(items.borrow().amount("iron_ore"), 0);
    }

    #[test]
    fn test_handle_without_proxies_fails() {
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        let mut rng = StdRng::seed_from_u64(3);
        assert!(!smelt().handle_recipe_io(Io::In, &mut table, &mut rng));
    }

    #[test]
    fn test_zero_chance_entries_are_skipped() {
        let items = ResourceStorage::new(64).shared();
        let mut table = table_with(&[(Io::Out, 1, items.clone())]);
        let recipe = Recipe::builder("lucky")
            .output(Capability::ITEM, Content::new(Ingredient::new("diamond", 1)).with_chance(0.0))
            .build();
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..10 {
            assert!(recipe.handle_recipe_io(Io::Out, &mut table, &mut rng));
        }
        assert_eq!(items.borrow().amount("diamond"), 0);
    }

    #[test]
    fn test_tick_contents() {
        let energy = ResourceStorage::new(1000).with("fe", 30).shared();
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        table.insert(
            Io::In,
            Box::new(StorageProxy::new(Capability::ENERGY, BlockPos::new(1, 0, 0), energy.clone())),
        );
        let recipe = Recipe::builder("powered")
            .tick_input(Capability::ENERGY, Content::new(Ingredient::new("fe", 10)))
            .build();
        let mut rng = StdRng::seed_from_u64(5);

        assert!(recipe.has_tick());
        assert!(recipe.match_tick_recipe(&table));
        assert!(recipe.handle_tick_recipe_io(Io::In, &mut table, &mut rng));
        assert_eq!(energy.borrow().amount("fe"), 20);
        assert!(!smelt().has_tick());
    }

    #[test]
    fn test_condition_groups() {
        let world = GridWorld::new("overworld").with_biome("plains");
        let ctx = ConditionContext::new(&world, BlockPos::ORIGIN);

        let recipe = Recipe::builder("and")
            .condition(DimensionCondition::new("overworld"))
            .condition(BiomeCondition::new("plains"))
            .build();
        assert!(recipe.check_conditions(&ctx));

        let recipe = Recipe::builder("or")
            .condition(BiomeCondition::new("desert").or())
            .condition(BiomeCondition::new("plains").or())
            .build();
        assert!(recipe.check_conditions(&ctx));

        let recipe = Recipe::builder("or_fails")
            .condition(DimensionCondition::new("overworld"))
            .condition(BiomeCondition::new("desert").or())
            .build();
        assert!(!recipe.check_conditions(&ctx));
    }

    #[test]
    fn test_working_hooks_prefer_same_direction() {
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        let items = ResourceStorage::new(8).shared();
        table.insert(Io::In, Box::new(StorageProxy::new(Capability::ITEM, BlockPos::new(1, 0, 0), items.clone())));
        table.insert(Io::Both, Box::new(StorageProxy::new(Capability::ITEM, BlockPos::new(2, 0, 0), items)));

        let mut hits = Vec::new();
        smelt().notify(&mut table, |proxy, _, io, _| hits.push((proxy.pos().x, io)));
        // the item output has no Out bucket and falls back to Both, still notified as Out
        assert_eq!(hits, vec![(1, Io::In), (2, Io::Out)]);
    }

    #[test]
    fn test_empty_table_never_matches() {
        let noop = Recipe::builder("noop").build();
        assert!(!noop.match_recipe(&ProxyTable::new(BlockPos::ORIGIN)));

        let table = table_with(&[(Io::Both, 1, ResourceStorage::new(8).shared())]);
        assert!(noop.match_recipe(&table));
    }
}
