//! Single-cell predicates

use crate::capability::{Capability, Io};
use crate::world::{Occupant, AIR};
use std::fmt;
use std::sync::Arc;

/// User supplied occupant test
#[derive(Clone)]
pub struct CustomTest {
    name: String,
    test: Arc<dyn Fn(&Occupant) -> bool + Send + Sync>,
}

impl CustomTest {
    pub fn new(name: impl Into<String>, test: impl Fn(&Occupant) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            test: Arc::new(test),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CustomTest").field(&self.name).finish()
    }
}

/// What a predicate tests for
///
/// Composite kinds combine with AND/OR/NOT logic.
#[derive(Debug, Clone)]
pub enum PredicateKind {
    /// Matches any occupant
    Any,

    /// Matches empty cells
    Air,

    /// Matches one of the listed block ids
    Blocks(Vec<String>),

    /// Matches a machine component with the given definition id
    Component(String),

    /// Matches the controller with the given definition id
    Controller(String),

    /// Matches an occupant exposing `capability`; matched cells are bound with `io`
    Capability { capability: Capability, io: Io },

    Custom(CustomTest),

    And(Vec<PredicateKind>),

    Or(Vec<PredicateKind>),

    Not(Box<PredicateKind>),
}

impl PredicateKind {
    pub fn test(&self, occupant: &Occupant) -> bool {
        match self {
            PredicateKind::Any => true,
            PredicateKind::Air => occupant.is_air(),
            PredicateKind::Blocks(ids) => ids.iter().any(|id| *id == occupant.block),
            PredicateKind::Component(id) | PredicateKind::Controller(id) => {
                occupant.component.as_deref() == Some(id.as_str())
            }
            PredicateKind::Capability { capability, .. } => occupant.has_capability(capability),
            PredicateKind::Custom(custom) => (custom.test)(occupant),
            PredicateKind::And(kinds) => kinds.iter().all(|k| k.test(occupant)),
            PredicateKind::Or(kinds) => kinds.iter().any(|k| k.test(occupant)),
            PredicateKind::Not(kind) => !kind.test(occupant),
        }
    }

    /// Combine with AND, flattening nested ANDs
    pub fn and(self, other: PredicateKind) -> Self {
        match (self, other) {
            (PredicateKind::And(mut a), PredicateKind::And(b)) => {
                a.extend(b);
                PredicateKind::And(a)
            }
            (PredicateKind::And(mut a), other) => {
                a.push(other);
                PredicateKind::And(a)
            }
            (this, PredicateKind::And(mut a)) => {
                a.insert(0, this);
                PredicateKind::And(a)
            }
            (a, b) => PredicateKind::And(vec![a, b]),
        }
    }

    /// Combine with OR, flattening nested ORs
    pub fn or(self, other: PredicateKind) -> Self {
        match (self, other) {
            (PredicateKind::Or(mut a), PredicateKind::Or(b)) => {
                a.extend(b);
                PredicateKind::Or(a)
            }
            (PredicateKind::Or(mut a), other) => {
                a.push(other);
                PredicateKind::Or(a)
            }
            (this, PredicateKind::Or(mut a)) => {
                a.insert(0, this);
                PredicateKind::Or(a)
            }
            (a, b) => PredicateKind::Or(vec![a, b]),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            PredicateKind::Not(inner) => *inner,
            other => PredicateKind::Not(Box::new(other)),
        }
    }

    /// Capability binding carried by this kind (top level or inside an AND)
    pub fn capability_binding(&self) -> Option<(&Capability, Io)> {
        match self {
            PredicateKind::Capability { capability, io } => Some((capability, *io)),
            PredicateKind::And(kinds) => kinds.iter().find_map(PredicateKind::capability_binding),
            _ => None,
        }
    }

    fn has_component(&self) -> bool {
        match self {
            PredicateKind::Component(_) => true,
            PredicateKind::And(kinds) => kinds.iter().any(PredicateKind::has_component),
            _ => false,
        }
    }

    fn default_candidates(&self) -> Vec<String> {
        match self {
            PredicateKind::Air => vec![AIR.to_string()],
            PredicateKind::Blocks(ids) => ids.clone(),
            PredicateKind::Component(id) | PredicateKind::Controller(id) => vec![id.clone()],
            PredicateKind::Capability { capability, io } => vec![format!("{capability} ({io})")],
            PredicateKind::Or(kinds) => kinds.iter().flat_map(|k| k.default_candidates()).collect(),
            PredicateKind::And(kinds) => kinds.first().map(|k| k.default_candidates()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |f: &mut fmt::Formatter<'_>, op: &str, kinds: &[PredicateKind]| {
            write!(f, "(")?;
            for (i, kind) in kinds.iter().enumerate() {
                if i > 0 {
                    write!(f, " {op} ")?;
                }
                write!(f, "{kind}")?;
            }
            write!(f, ")")
        };
        match self {
            PredicateKind::Any => write!(f, "any"),
            PredicateKind::Air => write!(f, "air"),
            PredicateKind::Blocks(ids) => write!(f, "blocks[{}]", ids.join(",")),
            PredicateKind::Component(id) => write!(f, "component[{id}]"),
            PredicateKind::Controller(id) => write!(f, "controller[{id}]"),
            PredicateKind::Capability { capability, io } => write!(f, "capability[{capability}:{io}]"),
            PredicateKind::Custom(custom) => write!(f, "custom[{}]", custom.name()),
            PredicateKind::And(kinds) => join(f, "and", kinds.as_slice()),
            PredicateKind::Or(kinds) => join(f, "or", kinds.as_slice()),
            PredicateKind::Not(kind) => write!(f, "not {kind}"),
        }
    }
}

/// A single-cell test with inclusive global count bounds.
///
/// The bounds only apply once the predicate is placed in the limited group
/// of a [`TraceabilityPredicate`](super::TraceabilityPredicate).
#[derive(Debug, Clone)]
pub struct Predicate {
    name: String,
    kind: PredicateKind,
    min_count: u32,
    max_count: u32,
    candidates: Vec<String>,
    disable_render: bool,
}

impl Predicate {
    pub fn new(kind: PredicateKind) -> Self {
        Self {
            name: kind.to_string(),
            candidates: kind.default_candidates(),
            kind,
            min_count: 0,
            max_count: u32::MAX,
            disable_render: false,
        }
    }

    pub fn any() -> Self {
        Self::new(PredicateKind::Any)
    }

    pub fn air() -> Self {
        Self::new(PredicateKind::Air)
    }

    pub fn blocks<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(PredicateKind::Blocks(ids.into_iter().map(Into::into).collect()))
    }

    pub fn component(id: impl Into<String>) -> Self {
        Self::new(PredicateKind::Component(id.into()))
    }

    pub fn controller(id: impl Into<String>) -> Self {
        Self::new(PredicateKind::Controller(id.into()))
    }

    pub fn capability(capability: Capability, io: Io) -> Self {
        Self::new(PredicateKind::Capability { capability, io })
    }

    pub fn custom(name: impl Into<String>, test: impl Fn(&Occupant) -> bool + Send + Sync + 'static) -> Self {
        Self::new(PredicateKind::Custom(CustomTest::new(name, test)))
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_candidates<I, S>(mut self, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.candidates = candidates.into_iter().map(Into::into).collect();
        self
    }

    /// Hide matched cells from the world renderer while formed
    pub fn disable_render(mut self) -> Self {
        self.disable_render = true;
        self
    }

    pub fn with_min_count(mut self, min: u32) -> Self {
        self.min_count = min;
        self
    }

    pub fn with_max_count(mut self, max: u32) -> Self {
        self.max_count = max;
        self
    }

    pub fn with_count_limits(self, min: u32, max: u32) -> Self {
        self.with_min_count(min).with_max_count(max)
    }

    /// Pure test against an occupant snapshot
    pub fn accepts(&self, occupant: &Occupant) -> bool {
        self.kind.test(occupant)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PredicateKind {
        &self.kind
    }

    pub fn min_count(&self) -> u32 {
        self.min_count
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_render_disabled(&self) -> bool {
        self.disable_render
    }

    pub fn is_controller(&self) -> bool {
        matches!(self.kind, PredicateKind::Controller(_))
    }

    pub fn is_any(&self) -> bool {
        matches!(self.kind, PredicateKind::Any)
    }

    /// Matched cells count as parts of the structure
    pub fn is_part(&self) -> bool {
        self.kind.has_component() || self.kind.capability_binding().is_some()
    }

    pub fn capability_binding(&self) -> Option<(&Capability, Io)> {
        self.kind.capability_binding()
    }

    pub(crate) fn limits_valid(&self) -> bool {
        self.min_count <= self.max_count
    }
}
