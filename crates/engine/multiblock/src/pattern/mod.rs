//! Structure templates and the predicate grammar they are built from

mod block_pattern;
mod context;
mod error;
mod predicate;
mod traceability;

pub use block_pattern::{BlockPattern, PatternBuilder, PatternMatch, Rotation, Transform};
pub use context::{CapabilitySlot, MatchContext, CAPABILITIES, PARTS, PREDICATE_COUNTS, RENDER_MASK};
pub use error::{PatternBuildError, PatternError};
pub use predicate::{CustomTest, Predicate, PredicateKind};
pub use traceability::TraceabilityPredicate;
