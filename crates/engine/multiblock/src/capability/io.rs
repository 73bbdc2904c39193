use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Direction a capability proxy participates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Io {
    /// Consumed by recipes
    In,
    /// Produced by recipes
    Out,
    /// Serves both input and output lookups
    Both,
}

impl Io {
    /// Whether a proxy registered under `self` serves a lookup for `wanted`
    pub fn serves(self, wanted: Io) -> bool {
        self == wanted || self == Io::Both
    }

    /// Parse `in` / `out` / `both` (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "in" | "input" => Some(Io::In),
            "out" | "output" => Some(Io::Out),
            "both" => Some(Io::Both),
            _ => None,
        }
    }
}

impl fmt::Display for Io {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Io::In => "in",
            Io::Out => "out",
            Io::Both => "both",
        })
    }
}

/// Kind of interaction surface a member exposes (items, fluids, energy, ...)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub const ITEM: Capability = Capability(Cow::Borrowed("item"));
    pub const FLUID: Capability = Capability(Cow::Borrowed("fluid"));
    pub const ENERGY: Capability = Capability(Cow::Borrowed("energy"));

    pub fn new(name: impl Into<String>) -> Self {
        Capability(Cow::Owned(name.into()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
