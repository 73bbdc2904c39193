//! KDL scenario files
//!
//! A scenario describes a single controller: the template it validates, the
//! recipes it runs and the world around it.
//!
//! ```kdl
//! settings recipe-search-interval=1 reform-interval=10
//!
//! controller "mbd:furnace" 0 64 0 {
//!     renderer base="furnace" working="furnace_lit"
//! }
//!
//! pattern {
//!     aisle "ISO"
//!     aisle " C "
//!     symbol "C" "mbd:casing"
//!     symbol "S" controller="mbd:furnace"
//!     symbol "I" component="mbd:item_hatch" capability="item" io="in"
//!     symbol "O" component="mbd:item_hatch" capability="item" io="out"
//!     rotations
//! }
//!
//! world dimension="overworld" {
//!     block "mbd:casing" 0 64 1
//!     component "mbd:item_hatch" -1 64 0
//!     component "mbd:item_hatch" 1 64 0
//!     storage -1 64 0 capability="item" capacity=64 {
//!         stack "sand" 2
//!     }
//!     storage 1 64 0 capability="item" capacity=64
//! }
//!
//! recipe "glass" duration=2 {
//!     input "sand" 1
//!     output "glass" 1
//!     dimension "overworld"
//! }
//! ```
//!
//! Several `symbol` nodes for the same character are OR-combined in
//! declaration order. The controller cell is placed in the world
//! automatically.

use anyhow::{anyhow, bail, Context, Result};
use kdl::{KdlDocument, KdlNode, KdlValue};
use multiblock::pattern::{BlockPattern, Predicate, PredicateKind, TraceabilityPredicate};
use multiblock::recipe::{BiomeCondition, DimensionCondition, RecipeBuilder};
use multiblock::{
    BlockPos, Capability, ChunkPos, Content, ControllerDefinition, GridWorld, Ingredient, Io,
    MultiblockConfig, Occupant, Recipe, RecipeMap, Renderers, ResourceStorage,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// A loaded scenario, ready to run
#[derive(Debug)]
pub struct Scenario {
    pub config: MultiblockConfig,
    pub controller: BlockPos,
    pub definition: Arc<ControllerDefinition>,
    pub world: GridWorld,
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_string(&content).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn from_string(content: &str) -> Result<Self> {
        let doc: KdlDocument = content.parse()?;

        let mut config = MultiblockConfig::default();
        let mut controller = None;
        let mut pattern = None;
        let mut world = None;
        let mut recipes = Vec::new();

        for node in doc.nodes() {
            match node.name().value() {
                "settings" => read_settings(node, &mut config)?,
                "controller" => controller = Some(read_controller(node)?),
                "pattern" => pattern = Some(read_pattern(node)?),
                "world" => world = Some(read_world(node)?),
                "recipe" => recipes.push(read_recipe(node)?),
                other => bail!("unknown node `{other}`"),
            }
        }

        let controller = controller.ok_or_else(|| anyhow!("missing `controller` node"))?;
        let pattern = pattern.ok_or_else(|| anyhow!("missing `pattern` node"))?;
        let mut world = world.unwrap_or_default();
        world.set(controller.pos, Occupant::component(controller.id.clone()));

        let mut recipe_map = RecipeMap::new(controller.id.clone());
        for recipe in recipes {
            recipe_map.add(recipe);
        }

        let mut definition =
            ControllerDefinition::new(controller.id, pattern, recipe_map).with_renderers(controller.renderers);
        if controller.always_update {
            definition = definition.always_update();
        }

        Ok(Self {
            config,
            controller: controller.pos,
            definition: Arc::new(definition),
            world,
        })
    }
}

struct ControllerNode {
    id: String,
    pos: BlockPos,
    always_update: bool,
    renderers: Renderers,
}

fn read_settings(node: &KdlNode, config: &mut MultiblockConfig) -> Result<()> {
    for (name, value) in props(node) {
        match name {
            "recipe-search-interval" => config.recipe_search_interval = as_u32(value, name)?,
            "reform-interval" => config.reform_interval = as_u32(value, name)?,
            other => bail!("unknown setting `{other}`"),
        }
    }
    Ok(())
}

fn read_controller(node: &KdlNode) -> Result<ControllerNode> {
    let id = arg_str(node, 0)?.to_string();
    let pos = arg_pos(node, 1)?;
    let mut always_update = false;
    let mut renderers = Renderers::default();

    for child in children(node) {
        match child.name().value() {
            "always-update" => always_update = true,
            "renderer" => {
                renderers.base = prop_str(child, "base")?.map(str::to_string);
                renderers.formed = prop_str(child, "formed")?.map(str::to_string);
                renderers.working = prop_str(child, "working")?.map(str::to_string);
            }
            other => bail!("unknown controller node `{other}`"),
        }
    }

    Ok(ControllerNode {
        id,
        pos,
        always_update,
        renderers,
    })
}

fn read_pattern(node: &KdlNode) -> Result<BlockPattern> {
    let mut builder = BlockPattern::builder();
    let mut symbols: BTreeMap<char, TraceabilityPredicate> = BTreeMap::new();

    for child in children(node) {
        match child.name().value() {
            "aisle" => {
                let rows = args(child)
                    .map(|value| as_str(value, "aisle").map(str::to_string))
                    .collect::<Result<Vec<_>>>()?;
                builder = builder.aisle(rows);
            }
            "symbol" => {
                let (symbol, predicate) = read_symbol(child)?;
                let combined = match symbols.remove(&symbol) {
                    Some(existing) => existing.or(predicate),
                    None => predicate,
                };
                symbols.insert(symbol, combined);
            }
            "rotations" => builder = builder.allow_rotations(),
            "mirrors" => builder = builder.allow_mirrors(),
            other => bail!("unknown pattern node `{other}`"),
        }
    }

    for (symbol, predicate) in symbols {
        builder = builder.symbol(symbol, predicate);
    }
    Ok(builder.build()?)
}

fn read_symbol(node: &KdlNode) -> Result<(char, TraceabilityPredicate)> {
    let text = arg_str(node, 0)?;
    let mut chars = text.chars();
    let symbol = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => bail!("symbol `{text}` must be a single character"),
    };

    let blocks = args(node)
        .skip(1)
        .map(|value| as_str(value, "block id").map(str::to_string))
        .collect::<Result<Vec<_>>>()?;

    let mut kinds = Vec::new();
    if !blocks.is_empty() {
        kinds.push(PredicateKind::Blocks(blocks));
    }
    match prop_str(node, "kind")? {
        Some("any") => kinds.push(PredicateKind::Any),
        Some("air") => kinds.push(PredicateKind::Air),
        Some(other) => bail!("unknown symbol kind `{other}`"),
        None => {}
    }
    if let Some(id) = prop_str(node, "controller")? {
        kinds.push(PredicateKind::Controller(id.to_string()));
    }
    if let Some(id) = prop_str(node, "component")? {
        kinds.push(PredicateKind::Component(id.to_string()));
    }
    if let Some(name) = prop_str(node, "capability")? {
        let io = match prop_str(node, "io")? {
            Some(io) => Io::parse(io).ok_or_else(|| anyhow!("unknown io `{io}`"))?,
            None => Io::Both,
        };
        kinds.push(PredicateKind::Capability {
            capability: Capability::new(name),
            io,
        });
    }

    let kind = kinds
        .into_iter()
        .reduce(PredicateKind::and)
        .ok_or_else(|| anyhow!("symbol `{symbol}` has no test"))?;
    let mut predicate = Predicate::new(kind);
    if let Some(name) = prop_str(node, "name")? {
        predicate = predicate.named(name);
    }

    let mut traceable = TraceabilityPredicate::new(predicate);
    let min = prop(node, "min").map(|v| as_u32(v, "min")).transpose()?;
    let max = prop(node, "max").map(|v| as_u32(v, "max")).transpose()?;
    traceable = match (min, max) {
        (Some(min), Some(max)) => traceable.set_global_limits(min, max),
        (Some(min), None) => traceable.set_min_global_limited(min),
        (None, Some(max)) => traceable.set_max_global_limited(max),
        (None, None) => traceable,
    };
    if prop(node, "render").map(|v| as_bool(v, "render")).transpose()? == Some(false) {
        traceable = traceable.disable_render();
    }
    Ok((symbol, traceable))
}

fn read_world(node: &KdlNode) -> Result<GridWorld> {
    let dimension = prop_str(node, "dimension")?.unwrap_or("overworld");
    let mut world = GridWorld::new(dimension);
    if let Some(biome) = prop_str(node, "biome")? {
        world = world.with_biome(biome);
    }

    for child in children(node) {
        match child.name().value() {
            "block" => world.set(arg_pos(child, 1)?, Occupant::block(arg_str(child, 0)?)),
            "component" => world.set(arg_pos(child, 1)?, Occupant::component(arg_str(child, 0)?)),
            "air" => {
                world.remove(arg_pos(child, 0)?);
            }
            "fill" => {
                let a = arg_pos(child, 1)?;
                let b = arg_pos(child, 4)?;
                let min = BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
                let max = BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
                world.fill(min, max, &Occupant::block(arg_str(child, 0)?));
            }
            "storage" => {
                let pos = arg_pos(child, 0)?;
                let capability = Capability::new(prop_str(child, "capability")?.unwrap_or(Capability::ITEM.name()));
                let capacity = match prop(child, "capacity") {
                    Some(value) => as_u64(value, "capacity")?,
                    None => 64,
                };
                let mut storage = ResourceStorage::new(capacity);
                for stack in children(child) {
                    if stack.name().value() != "stack" {
                        bail!("unknown storage node `{}`", stack.name().value());
                    }
                    storage = storage.with(arg_str(stack, 0)?, as_u64(arg(stack, 1)?, "amount")?);
                }
                world.attach_storage(pos, capability, storage.shared());
            }
            "unload" => {
                let x = as_i32(arg(child, 0)?, "chunk x")?;
                let z = as_i32(arg(child, 1)?, "chunk z")?;
                world.unload_chunk(ChunkPos::new(x, z));
            }
            other => bail!("unknown world node `{other}`"),
        }
    }
    Ok(world)
}

fn read_recipe(node: &KdlNode) -> Result<Recipe> {
    let uid = arg_str(node, 0)?;
    let mut builder = Recipe::builder(uid);
    if let Some(value) = prop(node, "duration") {
        builder = builder.duration(as_u32(value, "duration")?);
    }

    for child in children(node) {
        builder = read_recipe_entry(builder, child).with_context(|| format!("in recipe `{uid}`"))?;
    }
    Ok(builder.build())
}

fn read_recipe_entry(builder: RecipeBuilder, node: &KdlNode) -> Result<RecipeBuilder> {
    let builder = match node.name().value() {
        name @ ("input" | "output" | "tick-input" | "tick-output") => {
            let capability = Capability::new(prop_str(node, "capability")?.unwrap_or(Capability::ITEM.name()));
            let mut content = Content::new(Ingredient::new(arg_str(node, 0)?, as_u64(arg(node, 1)?, "amount")?));
            if let Some(chance) = prop(node, "chance") {
                content = content.with_chance(as_f64(chance, "chance")? as f32);
            }
            if let Some(slot) = prop_str(node, "slot")? {
                content = content.with_slot(slot);
            }
            match name {
                "input" => builder.input(capability, content),
                "output" => builder.output(capability, content),
                "tick-input" => builder.tick_input(capability, content),
                _ => builder.tick_output(capability, content),
            }
        }
        "dimension" => {
            let mut condition = DimensionCondition::new(arg_str(node, 0)?);
            if flag(node, "reverse")? {
                condition = condition.reversed();
            }
            if flag(node, "or")? {
                condition = condition.or();
            }
            builder.condition(condition)
        }
        "biome" => {
            let mut condition = BiomeCondition::new(arg_str(node, 0)?);
            if flag(node, "reverse")? {
                condition = condition.reversed();
            }
            if flag(node, "or")? {
                condition = condition.or();
            }
            builder.condition(condition)
        }
        "data" => {
            let mut builder = builder;
            for (key, value) in props(node) {
                builder = match value {
                    KdlValue::String(s) => builder.data(key, s.as_str()),
                    KdlValue::Integer(_) => builder.data(key, as_i64(value, key)?),
                    KdlValue::Float(f) => builder.data(key, *f),
                    KdlValue::Bool(b) => builder.data(key, *b),
                    KdlValue::Null => builder,
                };
            }
            builder
        }
        "text" => builder.text(arg_str(node, 0)?),
        other => bail!("unknown recipe node `{other}`"),
    };
    Ok(builder)
}

fn args(node: &KdlNode) -> impl Iterator<Item = &KdlValue> {
    node.entries().iter().filter(|e| e.name().is_none()).map(|e| e.value())
}

fn props(node: &KdlNode) -> impl Iterator<Item = (&str, &KdlValue)> {
    node.entries()
        .iter()
        .filter_map(|e| e.name().map(|name| (name.value(), e.value())))
}

fn children(node: &KdlNode) -> &[KdlNode] {
    node.children().map(|doc| doc.nodes()).unwrap_or(&[])
}

fn arg(node: &KdlNode, index: usize) -> Result<&KdlValue> {
    args(node)
        .nth(index)
        .ok_or_else(|| anyhow!("`{}` is missing argument {}", node.name().value(), index + 1))
}

fn arg_str(node: &KdlNode, index: usize) -> Result<&str> {
    as_str(arg(node, index)?, node.name().value())
}

fn arg_pos(node: &KdlNode, first: usize) -> Result<BlockPos> {
    let coord = |i: usize| as_i32(arg(node, first + i)?, "coordinate");
    Ok(BlockPos::new(coord(0)?, coord(1)?, coord(2)?))
}

fn prop<'a>(node: &'a KdlNode, name: &str) -> Option<&'a KdlValue> {
    props(node).find(|(key, _)| *key == name).map(|(_, value)| value)
}

fn prop_str<'a>(node: &'a KdlNode, name: &str) -> Result<Option<&'a str>> {
    prop(node, name).map(|value| as_str(value, name)).transpose()
}

fn flag(node: &KdlNode, name: &str) -> Result<bool> {
    Ok(prop(node, name).map(|value| as_bool(value, name)).transpose()?.unwrap_or(false))
}

fn as_str<'a>(value: &'a KdlValue, what: &str) -> Result<&'a str> {
    match value {
        KdlValue::String(s) => Ok(s.as_str()),
        other => bail!("expected a string for {what}, got {other}"),
    }
}

fn as_i64(value: &KdlValue, what: &str) -> Result<i64> {
    match value {
        KdlValue::Integer(i) => i64::try_from(*i).with_context(|| format!("{what} out of range")),
        other => bail!("expected an integer for {what}, got {other}"),
    }
}

fn as_i32(value: &KdlValue, what: &str) -> Result<i32> {
    i32::try_from(as_i64(value, what)?).with_context(|| format!("{what} out of range"))
}

fn as_u32(value: &KdlValue, what: &str) -> Result<u32> {
    u32::try_from(as_i64(value, what)?).with_context(|| format!("{what} must be a non-negative 32-bit integer"))
}

fn as_u64(value: &KdlValue, what: &str) -> Result<u64> {
    u64::try_from(as_i64(value, what)?).with_context(|| format!("{what} must not be negative"))
}

fn as_f64(value: &KdlValue, what: &str) -> Result<f64> {
    match value {
        KdlValue::Float(f) => Ok(*f),
        KdlValue::Integer(i) => Ok(*i as f64),
        other => bail!("expected a number for {what}, got {other}"),
    }
}

fn as_bool(value: &KdlValue, what: &str) -> Result<bool> {
    match value {
        KdlValue::Bool(b) => Ok(*b),
        other => bail!("expected a boolean for {what}, got {other}"),
    }
}
