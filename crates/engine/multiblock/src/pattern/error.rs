//! Runtime match errors and template compilation errors

use crate::pos::BlockPos;
use thiserror::Error;

/// Why a structure is not formed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// The controller was never validated
    #[error("structure not yet validated")]
    Uninitialized,

    /// A checked cell lies in an unloaded chunk; retried on the next load
    #[error("chunk containing {pos} is not loaded")]
    UnloadedChunk { pos: BlockPos },

    /// No predicate accepted the occupant of a cell
    #[error("unexpected block at {pos}, expected one of {candidates:?}")]
    Mismatch {
        pos: BlockPos,
        candidates: Vec<String>,
    },

    /// A limited predicate matched too few or too many cells
    #[error("`{predicate}` matched {count} cells, allowed {min}..={max}")]
    CountLimit {
        predicate: String,
        count: u32,
        min: u32,
        max: u32,
    },

    /// A member is already part of another formed structure
    #[error("member {pos} already belongs to the controller at {owner}")]
    MemberClaimed { pos: BlockPos, owner: BlockPos },

    /// The controller cell itself changed
    #[error("controller was removed")]
    ControllerRemoved,

    /// Validation faulted unexpectedly
    #[error("validation fault: {0}")]
    Fault(String),
}

impl PatternError {
    /// Transient errors are retried and never cached as a structural result
    pub fn is_transient(&self) -> bool {
        matches!(self, PatternError::UnloadedChunk { .. })
    }

    /// The world does not contain the declared structure
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            PatternError::Mismatch { .. } | PatternError::CountLimit { .. }
        )
    }
}

/// Errors raised while compiling a pattern template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternBuildError {
    #[error("pattern has no aisles")]
    Empty,

    #[error("aisle {aisle} does not match the size of the first aisle")]
    RaggedAisle { aisle: usize },

    #[error("symbol '{0}' has no predicate")]
    UnknownSymbol(char),

    #[error("pattern must contain exactly one controller cell, found {0}")]
    ControllerCount(usize),

    #[error("`{predicate}` has min count {min} above max count {max}")]
    InvalidCountLimits { predicate: String, min: u32, max: u32 },
}
