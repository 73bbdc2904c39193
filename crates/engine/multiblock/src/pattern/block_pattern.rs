//! Compiled 3-D structure templates and the world search

use super::context::{CapabilitySlot, MatchContext, PARTS, PREDICATE_COUNTS, RENDER_MASK};
use super::error::{PatternBuildError, PatternError};
use super::predicate::Predicate;
use super::traceability::TraceabilityPredicate;
use crate::pos::BlockPos;
use crate::world::World;
use glam::IVec3;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

/// Quarter turn about the vertical axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rotation {
    None,
    Clockwise90,
    Clockwise180,
    CounterClockwise90,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::None,
        Rotation::Clockwise90,
        Rotation::Clockwise180,
        Rotation::CounterClockwise90,
    ];

    fn apply(self, v: IVec3) -> IVec3 {
        match self {
            Rotation::None => v,
            Rotation::Clockwise90 => IVec3::new(-v.z, v.y, v.x),
            Rotation::Clockwise180 => IVec3::new(-v.x, v.y, -v.z),
            Rotation::CounterClockwise90 => IVec3::new(v.z, v.y, -v.x),
        }
    }
}

/// Orientation a template is tried in: optional X mirror, then rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Transform {
    pub rotation: Rotation,
    pub mirror: bool,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        rotation: Rotation::None,
        mirror: false,
    };

    pub const fn new(rotation: Rotation, mirror: bool) -> Self {
        Self { rotation, mirror }
    }

    /// Map a template offset to a world offset
    pub fn apply(self, offset: IVec3) -> IVec3 {
        let v = if self.mirror {
            IVec3::new(-offset.x, offset.y, offset.z)
        } else {
            offset
        };
        self.rotation.apply(v)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Template cell relative to the controller
#[derive(Debug, Clone)]
struct PatternCell {
    offset: IVec3,
    predicate: TraceabilityPredicate,
}

/// Result of a successful search
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    pub context: MatchContext,
    /// Absolute positions of every checked cell, controller included
    pub members: HashSet<BlockPos>,
    pub transform: Transform,
}

/// A compiled structure template.
///
/// Cells are stored relative to the single controller cell. Cells whose
/// predicate accepts anything are dropped at build time and never checked.
#[derive(Debug, Clone)]
pub struct BlockPattern {
    cells: Vec<PatternCell>,
    transforms: Vec<Transform>,
    size: IVec3,
    limited: Vec<Arc<Predicate>>,
}

impl BlockPattern {
    pub fn builder() -> PatternBuilder {
        PatternBuilder::default()
    }

    /// Size of the template grid (columns, rows, aisles)
    pub fn size(&self) -> IVec3 {
        self.size
    }

    pub fn transforms(&self) -> &[Transform] {
        &self.transforms
    }

    /// Number of checked cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Absolute positions the template covers in the given orientation
    pub fn positions(&self, controller: BlockPos, transform: Transform) -> impl Iterator<Item = BlockPos> + '_ {
        self.cells
            .iter()
            .map(move |cell| controller.offset(transform.apply(cell.offset)))
    }

    /// Scan the world around `controller`.
    ///
    /// Transforms are tried in declared order and the first full match wins.
    /// A rejected cell only abandons the current transform; an unloaded cell
    /// aborts the whole search with a transient error.
    pub fn search(&self, world: &dyn World, controller: BlockPos) -> Result<PatternMatch, PatternError> {
        let mut best: Option<(usize, PatternError)> = None;

        for &transform in &self.transforms {
            match self.try_transform(world, controller, transform) {
                Ok(found) => return Ok(found),
                Err(Attempt::Unloaded(pos)) => return Err(PatternError::UnloadedChunk { pos }),
                Err(Attempt::Failed { progress, error }) => {
                    if best.as_ref().map_or(true, |(p, _)| progress > *p) {
                        best = Some((progress, error));
                    }
                }
            }
        }

        Err(best.map(|(_, error)| error).unwrap_or(PatternError::Mismatch {
            pos: controller,
            candidates: Vec::new(),
        }))
    }

    fn try_transform(
        &self,
        world: &dyn World,
        controller: BlockPos,
        transform: Transform,
    ) -> Result<PatternMatch, Attempt> {
        let mut context = MatchContext::new();
        let mut members = HashSet::with_capacity(self.cells.len());
        let mut global_count: HashMap<*const Predicate, u32> = HashMap::new();

        for (index, cell) in self.cells.iter().enumerate() {
            let pos = controller.offset(transform.apply(cell.offset));
            if !world.is_loaded(pos) {
                return Err(Attempt::Unloaded(pos));
            }

            let occupant = world.occupant(pos);
            let Some(predicate) = cell.predicate.test(&occupant) else {
                return Err(Attempt::Failed {
                    progress: index,
                    error: PatternError::Mismatch {
                        pos,
                        candidates: cell.predicate.candidates(),
                    },
                });
            };

            if cell.predicate.is_limited(predicate) {
                *global_count.entry(Arc::as_ptr(predicate)).or_insert(0) += 1;
            }
            record(&mut context, predicate, pos);
            members.insert(pos);
        }

        for predicate in &self.limited {
            let count = global_count.get(&Arc::as_ptr(predicate)).copied().unwrap_or(0);
            if count < predicate.min_count() || count > predicate.max_count() {
                return Err(Attempt::Failed {
                    progress: self.cells.len(),
                    error: PatternError::CountLimit {
                        predicate: predicate.name().to_string(),
                        count,
                        min: predicate.min_count(),
                        max: predicate.max_count(),
                    },
                });
            }
        }

        Ok(PatternMatch {
            context,
            members,
            transform,
        })
    }
}

enum Attempt {
    Unloaded(BlockPos),
    Failed { progress: usize, error: PatternError },
}

/// Fill the context entries attributed to the credited predicate
fn record(context: &mut MatchContext, predicate: &Predicate, pos: BlockPos) {
    context.increment(PREDICATE_COUNTS, predicate.name());
    if predicate.is_render_disabled() {
        context.add_position(RENDER_MASK, pos);
    }
    if predicate.is_part() {
        context.add_position(PARTS, pos);
    }
    if let Some((capability, io)) = predicate.capability_binding() {
        context.add_slot(CapabilitySlot {
            pos,
            capability: capability.clone(),
            io,
        });
    }
}

/// Builds a [`BlockPattern`] from aisle strings.
///
/// Each aisle is a vertical slice; aisles advance along +Z, the strings of an
/// aisle are rows advancing along +Y, and characters advance along +X. A space
/// matches anything.
///
/// ```
/// use multiblock::pattern::{BlockPattern, Predicate};
///
/// let pattern = BlockPattern::builder()
///     .aisle(["CCC", "CCC"])
///     .aisle(["CSC", "C C"])
///     .aisle(["CCC", "CCC"])
///     .symbol('C', Predicate::blocks(["mbd:casing"]))
///     .symbol('S', Predicate::controller("mbd:furnace"))
///     .build()
///     .unwrap();
/// assert_eq!(pattern.cell_count(), 17);
/// ```
#[derive(Debug, Default)]
pub struct PatternBuilder {
    aisles: Vec<Vec<String>>,
    symbols: BTreeMap<char, TraceabilityPredicate>,
    transforms: Vec<Transform>,
}

impl PatternBuilder {
    pub fn aisle<I, S>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aisles.push(rows.into_iter().map(Into::into).collect());
        self
    }

    /// Bind a symbol to a predicate
    pub fn symbol(mut self, symbol: char, predicate: impl Into<TraceabilityPredicate>) -> Self {
        self.symbols.insert(symbol, predicate.into());
        self
    }

    /// Also try the template in every horizontal rotation
    pub fn allow_rotations(self) -> Self {
        let transforms = Rotation::ALL.map(|r| Transform::new(r, false));
        self.transforms(transforms)
    }

    /// Also try every rotation of the X-mirrored template
    pub fn allow_mirrors(self) -> Self {
        let transforms = Rotation::ALL.map(|r| Transform::new(r, true));
        self.transforms(transforms)
    }

    /// Append orientations to try, in order. Defaults to identity only.
    pub fn transforms(mut self, transforms: impl IntoIterator<Item = Transform>) -> Self {
        if self.transforms.is_empty() {
            self.transforms.push(Transform::IDENTITY);
        }
        for transform in transforms {
            if !self.transforms.contains(&transform) {
                self.transforms.push(transform);
            }
        }
        self
    }

    pub fn build(self) -> Result<BlockPattern, PatternBuildError> {
        let rows = self.aisles.first().map(Vec::len).ok_or(PatternBuildError::Empty)?;
        let columns = self
            .aisles
            .first()
            .and_then(|a| a.first())
            .map(|row| row.chars().count())
            .ok_or(PatternBuildError::Empty)?;
        if rows == 0 || columns == 0 {
            return Err(PatternBuildError::Empty);
        }

        let mut grid = Vec::new();
        let mut controller = Vec::new();
        for (z, aisle) in self.aisles.iter().enumerate() {
            if aisle.len() != rows || aisle.iter().any(|row| row.chars().count() != columns) {
                return Err(PatternBuildError::RaggedAisle { aisle: z });
            }
            for (y, row) in aisle.iter().enumerate() {
                for (x, symbol) in row.chars().enumerate() {
                    let at = IVec3::new(x as i32, y as i32, z as i32);
                    let predicate = match symbol {
                        ' ' => continue,
                        _ => self
                            .symbols
                            .get(&symbol)
                            .ok_or(PatternBuildError::UnknownSymbol(symbol))?,
                    };
                    if predicate.has_controller() {
                        controller.push(at);
                    }
                    if !predicate.is_any() {
                        grid.push((at, predicate.clone()));
                    }
                }
            }
        }

        let origin = match controller.as_slice() {
            [only] => *only,
            other => return Err(PatternBuildError::ControllerCount(other.len())),
        };

        let mut limited: Vec<Arc<Predicate>> = Vec::new();
        for (_, predicate) in &grid {
            for p in predicate.limited() {
                if !p.limits_valid() {
                    return Err(PatternBuildError::InvalidCountLimits {
                        predicate: p.name().to_string(),
                        min: p.min_count(),
                        max: p.max_count(),
                    });
                }
                if !limited.iter().any(|known| Arc::ptr_eq(known, p)) {
                    limited.push(p.clone());
                }
            }
        }

        // controller cell first so an absent controller fails fast
        grid.sort_by_key(|(at, _)| *at != origin);

        let cells = grid
            .into_iter()
            .map(|(at, predicate)| PatternCell {
                offset: at - origin,
                predicate,
            })
            .collect();

        let transforms = if self.transforms.is_empty() {
            vec![Transform::IDENTITY]
        } else {
            self.transforms
        };

        Ok(BlockPattern {
            cells,
            transforms,
            size: IVec3::new(columns as i32, rows as i32, self.aisles.len() as i32),
            limited,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{GridWorld, Occupant};
    use std::collections::BTreeSet;

    fn furnace() -> PatternBuilder {
        BlockPattern::builder()
            .aisle(["CSC"])
            .symbol('C', Predicate::blocks(["mbd:casing"]))
            .symbol('S', Predicate::controller("mbd:furnace"))
    }

    #[test]
    fn test_transform_rotations() {
        let v = IVec3::new(1, 2, 0);
        assert_eq!(Transform::new(Rotation::Clockwise90, false).apply(v), IVec3::new(0, 2, 1));
        assert_eq!(Transform::new(Rotation::Clockwise180, false).apply(v), IVec3::new(-1, 2, 0));
        assert_eq!(Transform::new(Rotation::CounterClockwise90, false).apply(v), IVec3::new(0, 2, -1));
        assert_eq!(Transform::new(Rotation::None, true).apply(v), IVec3::new(-1, 2, 0));
    }

    #[test]
    fn test_build_errors() {
        let err = BlockPattern::builder().build().unwrap_err();
        assert_eq!(err, PatternBuildError::Empty);

        let err = furnace().aisle(["CC"]).build().unwrap_err();
        assert_eq!(err, PatternBuildError::RaggedAisle { aisle: 1 });

        let err = furnace().aisle(["XXX"]).build().unwrap_err();
        assert_eq!(err, PatternBuildError::UnknownSymbol('X'));

        let err = furnace().aisle(["SSS"]).build().unwrap_err();
        assert_eq!(err, PatternBuildError::ControllerCount(4));

        let err = BlockPattern::builder()
            .aisle(["CCC"])
            .symbol('C', Predicate::blocks(["mbd:casing"]))
            .build()
            .unwrap_err();
        assert_eq!(err, PatternBuildError::ControllerCount(0));

        let err = furnace()
            .aisle(["HHH"])
            .symbol('H', TraceabilityPredicate::new(Predicate::air().named("gap")).set_global_limits(3, 1))
            .build()
            .unwrap_err();
        assert!(matches!(err, PatternBuildError::InvalidCountLimits { min: 3, max: 1, .. }));
    }

    #[test]
    fn test_search_with_rotation() {
        let pattern = furnace().allow_rotations().build().unwrap();
        assert_eq!(pattern.transforms().len(), 4);

        let mut world = GridWorld::default();
        let controller = BlockPos::new(5, 0, 5);
        world.set(controller, Occupant::component("mbd:furnace"));
        // built along Z instead of X
        world.set(BlockPos::new(5, 0, 4), Occupant::block("mbd:casing"));
        world.set(BlockPos::new(5, 0, 6), Occupant::block("mbd:casing"));

        let found = pattern.search(&world, controller).unwrap();
        assert_eq!(found.members.len(), 3);
        assert_ne!(found.transform, Transform::IDENTITY);

        let identity_only = furnace().build().unwrap();
        let err = identity_only.search(&world, controller).unwrap_err();
        assert!(err.is_mismatch());
    }

    #[test]
    fn test_unloaded_chunk_is_transient() {
        let pattern = furnace().build().unwrap();
        let mut world = GridWorld::default();
        let controller = BlockPos::new(0, 0, 0);
        world.set(controller, Occupant::component("mbd:furnace"));
        world.unload_chunk(BlockPos::new(-1, 0, 0).chunk());

        let err = pattern.search(&world, controller).unwrap_err();
        assert_eq!(err, PatternError::UnloadedChunk { pos: BlockPos::new(-1, 0, 0) });
        assert!(err.is_transient());
    }

    #[test]
    fn test_any_cells_are_skipped() {
        let pattern = BlockPattern::builder()
            .aisle(["S A"])
            .symbol('S', Predicate::controller("mbd:furnace"))
            .symbol('A', Predicate::any())
            .build()
            .unwrap();
        assert_eq!(pattern.cell_count(), 1);
        assert_eq!(pattern.size(), IVec3::new(3, 1, 1));
    }

    #[test]
    fn test_limited_before_any_is_still_counted() {
        let pattern = BlockPattern::builder()
            .aisle(["SX"])
            .symbol('S', Predicate::controller("mbd:furnace"))
            .symbol(
                'X',
                TraceabilityPredicate::new(Predicate::component("mbd:hatch"))
                    .set_global_limits(1, 1)
                    .or(Predicate::any()),
            )
            .build()
            .unwrap();
        assert_eq!(pattern.cell_count(), 2);

        let controller = BlockPos::new(0, 0, 0);
        let hatch = BlockPos::new(1, 0, 0);
        let mut world = GridWorld::default();
        world.set(controller, Occupant::component("mbd:furnace"));
        world.set(hatch, Occupant::block("stone"));

        let err = pattern.search(&world, controller).unwrap_err();
        assert!(matches!(err, PatternError::CountLimit { count: 0, min: 1, max: 1, .. }), "{err}");

        world.set(hatch, Occupant::component("mbd:hatch"));
        let found = pattern.search(&world, controller).unwrap();
        assert_eq!(found.members.len(), 2);
    }

    #[test]
    fn test_render_disabled_cells_fill_mask() {
        let pattern = BlockPattern::builder()
            .aisle(["CGSGC"])
            .symbol('C', Predicate::blocks(["mbd:casing"]))
            .symbol('G', Predicate::blocks(["mbd:glass"]).disable_render())
            .symbol('S', Predicate::controller("mbd:furnace"))
            .build()
            .unwrap();

        let controller = BlockPos::new(3, 5, 3);
        let mut world = GridWorld::default();
        world.set(controller, Occupant::component("mbd:furnace"));
        for dx in [-1, 1] {
            world.set(controller.offset(IVec3::new(dx, 0, 0)), Occupant::block("mbd:glass"));
        }
        for dx in [-2, 2] {
            world.set(controller.offset(IVec3::new(dx, 0, 0)), Occupant::block("mbd:casing"));
        }

        let found = pattern.search(&world, controller).unwrap();
        assert_eq!(found.members.len(), 5);
        let expected: BTreeSet<BlockPos> = [BlockPos::new(2, 5, 3), BlockPos::new(4, 5, 3)].into_iter().collect();
        assert_eq!(found.context.render_mask(), expected);
    }
}
