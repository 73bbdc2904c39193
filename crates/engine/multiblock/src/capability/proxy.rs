//! Proxy trait binding a member capability to recipe matching

use super::{Capability, Io};
use crate::pos::BlockPos;
use crate::recipe::{Ingredient, Recipe};
use std::fmt;

/// Live binding of a capability to one structure member.
///
/// Both content operations receive the contents still left to satisfy and
/// return what this proxy could not satisfy. An empty result means the list
/// is fully satisfied and no further proxy is consulted.
pub trait CapabilityProxy: fmt::Debug {
    fn capability(&self) -> &Capability;

    /// Member position this proxy is bound to
    fn pos(&self) -> BlockPos;

    /// Feasibility check; must not change any state
    fn search_recipe(&self, io: Io, recipe: &Recipe, left: Vec<Ingredient>) -> Vec<Ingredient>;

    /// Consume (`Io::In`) or produce (`Io::Out`) contents
    fn handle_recipe(&mut self, io: Io, recipe: &Recipe, left: Vec<Ingredient>) -> Vec<Ingredient>;

    /// Called right before a recipe starts working
    fn pre_working(&mut self, _holder: BlockPos, _io: Io, _recipe: &Recipe) {}

    /// Called right after a recipe finished working
    fn post_working(&mut self, _holder: BlockPos, _io: Io, _recipe: &Recipe) {}
}
