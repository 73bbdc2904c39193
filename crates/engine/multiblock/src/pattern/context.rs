//! Side-channel data produced by a successful match

use crate::capability::{Capability, Io};
use crate::pos::BlockPos;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Positions hidden from the world renderer while formed
pub const RENDER_MASK: &str = "renderMask";
/// Number of cells credited to each predicate, by predicate name
pub const PREDICATE_COUNTS: &str = "predicates";
/// Capability bindings of matched members
pub const CAPABILITIES: &str = "capabilities";
/// Positions of matched machine parts
pub const PARTS: &str = "parts";

/// Capability a matched member should be bound with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySlot {
    pub pos: BlockPos,
    pub capability: Capability,
    pub io: Io,
}

/// Insertion-ordered string-keyed map of typed values.
///
/// Built from scratch on every match attempt and only filled by the matcher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchContext {
    entries: Vec<(String, Value)>,
}

impl MatchContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a Value) -> &'a Value {
        self.get(key).unwrap_or(default)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert or replace, keeping the original position of an existing key
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn entry(&mut self, key: &str, init: impl FnOnce() -> Value) -> &mut Value {
        let index = match self.entries.iter().position(|(k, _)| k == key) {
            Some(index) => index,
            None => {
                self.entries.push((key.to_string(), init()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    pub(crate) fn add_position(&mut self, key: &str, pos: BlockPos) {
        if let Value::Positions(set) = self.entry(key, || Value::Positions(BTreeSet::new())) {
            set.insert(pos);
        }
    }

    pub(crate) fn increment(&mut self, key: &str, name: &str) {
        if let Value::Counts(counts) = self.entry(key, || Value::Counts(BTreeMap::new())) {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    pub(crate) fn add_slot(&mut self, slot: CapabilitySlot) {
        if let Value::Slots(slots) = self.entry(CAPABILITIES, || Value::Slots(Vec::new())) {
            slots.push(slot);
        }
    }

    /// Positions hidden from rendering, empty when none
    pub fn render_mask(&self) -> BTreeSet<BlockPos> {
        self.get(RENDER_MASK)
            .and_then(Value::as_positions)
            .cloned()
            .unwrap_or_default()
    }

    pub fn parts(&self) -> BTreeSet<BlockPos> {
        self.get(PARTS)
            .and_then(Value::as_positions)
            .cloned()
            .unwrap_or_default()
    }

    pub fn capability_slots(&self) -> &[CapabilitySlot] {
        self.get(CAPABILITIES).and_then(Value::as_slots).unwrap_or(&[])
    }

    pub fn predicate_count(&self, name: &str) -> u32 {
        self.get(PREDICATE_COUNTS)
            .and_then(Value::as_counts)
            .and_then(|counts| counts.get(name).copied())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_is_kept() {
        let mut ctx = MatchContext::new();
        ctx.set("b", Value::Int(1));
        ctx.set("a", Value::Int(2));
        ctx.set("b", Value::Int(3));

        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(ctx.get("b").and_then(Value::as_int), Some(3));
        assert!(ctx.get_or("missing", &Value::Null).is_null());
    }

    #[test]
    fn test_typed_helpers() {
        let mut ctx = MatchContext::new();
        ctx.add_position(RENDER_MASK, BlockPos::new(1, 0, 0));
        ctx.add_position(RENDER_MASK, BlockPos::new(1, 0, 0));
        ctx.increment(PREDICATE_COUNTS, "casing");
        ctx.increment(PREDICATE_COUNTS, "casing");
        ctx.add_slot(CapabilitySlot {
            pos: BlockPos::new(2, 0, 0),
            capability: Capability::ITEM,
            io: Io::In,
        });

        assert_eq!(ctx.render_mask().len(), 1);
        assert_eq!(ctx.predicate_count("casing"), 2);
        assert_eq!(ctx.predicate_count("glass"), 0);
        assert_eq!(ctx.capability_slots().len(), 1);
        assert!(ctx.parts().is_empty());
    }
}
