//! Scripting hook surface
//!
//! Embedders (script runtimes, mods, tools) observe structure changes and may
//! override a few computed values. Every method has a default, so an empty
//! implementation leaves the engine on its default behavior.

use crate::capability::{Capability, Io};
use crate::pos::BlockPos;

pub trait StructureEvents {
    /// Override the direction a member capability is bound with
    fn select_capability_io(
        &self,
        _controller: BlockPos,
        _member: BlockPos,
        _capability: &Capability,
        _io: Io,
    ) -> Option<Io> {
        None
    }

    /// Override the renderer chosen for a controller
    fn update_renderer(&self, _controller: BlockPos, _renderer: &str) -> Option<String> {
        None
    }

    fn structure_formed(&self, _controller: BlockPos) {}

    fn structure_invalid(&self, _controller: BlockPos) {}

    fn part_added(&self, _controller: BlockPos, _part: BlockPos) {}

    fn part_removed(&self, _controller: BlockPos, _part: BlockPos) {}
}

/// Listener that never overrides anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvents;

impl StructureEvents for NoEvents {}
