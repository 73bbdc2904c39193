//! Composable per-cell predicate sets

use super::predicate::{Predicate, PredicateKind};
use crate::world::Occupant;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Entry {
    predicate: Arc<Predicate>,
    limited: bool,
}

/// Predicates a template cell accepts, split into a common group (no count
/// bounds) and a limited group (global count bounds checked after the scan).
///
/// A cell is satisfied when any predicate accepts it; the first accepting
/// predicate in declaration order is credited with the cell.
#[derive(Debug, Clone, Default)]
pub struct TraceabilityPredicate {
    entries: Vec<Entry>,
}

impl TraceabilityPredicate {
    pub fn new(predicate: Predicate) -> Self {
        Self::default().or(predicate)
    }

    /// Predicate matching any occupant; cells using it are skipped
    pub fn any() -> Self {
        Self::new(Predicate::any())
    }

    /// Add `predicate` to the common group
    pub fn or(mut self, predicate: impl Into<TraceabilityPredicate>) -> Self {
        for entry in predicate.into().entries {
            self.push(entry);
        }
        self
    }

    /// Cells must satisfy both sides. The result is a single common predicate.
    pub fn and(self, other: impl Into<TraceabilityPredicate>) -> Self {
        let kind = self.combined_kind().and(other.into().combined_kind());
        Self::new(Predicate::new(kind))
    }

    /// Cells must satisfy neither side of `self`. The result is a single common predicate.
    pub fn not(self) -> Self {
        Self::new(Predicate::new(self.combined_kind().negate()))
    }

    /// Move every predicate into the limited group with at least `min` matches
    pub fn set_min_global_limited(self, min: u32) -> Self {
        self.map_limited(|p| p.with_min_count(min))
    }

    /// Move every predicate into the limited group with at most `max` matches
    pub fn set_max_global_limited(self, max: u32) -> Self {
        self.map_limited(|p| p.with_max_count(max))
    }

    pub fn set_global_limits(self, min: u32, max: u32) -> Self {
        self.map_limited(|p| p.with_count_limits(min, max))
    }

    /// Hide every cell matched by these predicates from the world renderer
    pub fn disable_render(self) -> Self {
        self.map(|p| p.disable_render(), None)
    }

    /// First accepting predicate in declaration order
    pub fn test(&self, occupant: &Occupant) -> Option<&Arc<Predicate>> {
        self.entries
            .iter()
            .find(|entry| entry.predicate.accepts(occupant))
            .map(|entry| &entry.predicate)
    }

    pub fn common(&self) -> impl Iterator<Item = &Arc<Predicate>> {
        self.entries.iter().filter(|e| !e.limited).map(|e| &e.predicate)
    }

    pub fn limited(&self) -> impl Iterator<Item = &Arc<Predicate>> {
        self.entries.iter().filter(|e| e.limited).map(|e| &e.predicate)
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Arc<Predicate>> {
        self.entries.iter().map(|e| &e.predicate)
    }

    pub fn is_limited(&self, predicate: &Arc<Predicate>) -> bool {
        self.entries
            .iter()
            .any(|e| e.limited && Arc::ptr_eq(&e.predicate, predicate))
    }

    /// True when the cell needs no check at all: the first entry is an
    /// unlimited `any`, so nothing declared after it can be credited
    pub fn is_any(&self) -> bool {
        self.entries
            .first()
            .is_some_and(|e| !e.limited && e.predicate.is_any())
    }

    pub fn has_controller(&self) -> bool {
        self.entries.iter().any(|e| e.predicate.is_controller())
    }

    /// Display candidates of all predicates, deduplicated
    pub fn candidates(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for candidate in self.entries.iter().flat_map(|e| e.predicate.candidates()) {
            if !out.contains(candidate) {
                out.push(candidate.clone());
            }
        }
        out
    }

    fn push(&mut self, entry: Entry) {
        if !self
            .entries
            .iter()
            .any(|e| Arc::ptr_eq(&e.predicate, &entry.predicate))
        {
            self.entries.push(entry);
        }
    }

    fn map_limited(self, f: impl Fn(Predicate) -> Predicate) -> Self {
        self.map(f, Some(true))
    }

    fn map(self, f: impl Fn(Predicate) -> Predicate, limited: Option<bool>) -> Self {
        let entries = self
            .entries
            .into_iter()
            .map(|entry| Entry {
                predicate: Arc::new(f(Arc::unwrap_or_clone(entry.predicate))),
                limited: limited.unwrap_or(entry.limited),
            })
            .collect();
        Self { entries }
    }

    fn combined_kind(&self) -> PredicateKind {
        let mut kinds = self.entries.iter().map(|e| e.predicate.kind().clone());
        match (kinds.next(), kinds.len()) {
            (None, _) => PredicateKind::Or(Vec::new()),
            (Some(only), 0) => only,
            (Some(first), _) => kinds.fold(first, PredicateKind::or),
        }
    }
}

impl From<Predicate> for TraceabilityPredicate {
    fn from(predicate: Predicate) -> Self {
        Self {
            entries: vec![Entry {
                predicate: Arc::new(predicate),
                limited: false,
            }],
        }
    }
}

impl From<Arc<Predicate>> for TraceabilityPredicate {
    fn from(predicate: Arc<Predicate>) -> Self {
        Self {
            entries: vec![Entry {
                predicate,
                limited: false,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_declared_predicate_is_credited() {
        let casing = Predicate::blocks(["mbd:casing"]).named("casing");
        let anything = Predicate::custom("solid", |o| !o.is_air()).named("solid");
        let tp = TraceabilityPredicate::new(casing).or(anything);

        let credited = tp.test(&Occupant::block("mbd:casing")).map(|p| p.name().to_string());
        assert_eq!(credited.as_deref(), Some("casing"));
        let credited = tp.test(&Occupant::block("stone")).map(|p| p.name().to_string());
        assert_eq!(credited.as_deref(), Some("solid"));
        assert!(tp.test(&Occupant::air()).is_none());
    }

    #[test]
    fn test_limits_move_predicates_to_limited() {
        let tp = TraceabilityPredicate::new(Predicate::component("mbd:hatch")).set_global_limits(1, 2);
        assert_eq!(tp.common().count(), 0);
        let limited: Vec<_> = tp.limited().collect();
        assert_eq!(limited.len(), 1);
        assert_eq!((limited[0].min_count(), limited[0].max_count()), (1, 2));
        assert!(tp.is_limited(limited[0]));
    }

    #[test]
    fn test_or_keeps_limited_group() {
        let hatch = TraceabilityPredicate::new(Predicate::component("mbd:hatch")).set_max_global_limited(1);
        let tp = TraceabilityPredicate::new(Predicate::blocks(["mbd:casing"])).or(hatch);
        assert_eq!(tp.common().count(), 1);
        assert_eq!(tp.limited().count(), 1);
        assert_eq!(tp.candidates(), vec!["mbd:casing".to_string(), "mbd:hatch".to_string()]);
    }

    #[test]
    fn test_and_not() {
        let solid = TraceabilityPredicate::new(Predicate::custom("solid", |o| !o.is_air()));
        let not_glass = TraceabilityPredicate::new(Predicate::blocks(["mbd:glass"])).not();
        let tp = solid.and(not_glass);
        assert!(tp.test(&Occupant::block("stone")).is_some());
        assert!(tp.test(&Occupant::block("mbd:glass")).is_none());
        assert!(tp.test(&Occupant::air()).is_none());
    }

    #[test]
    fn test_any_cell() {
        assert!(TraceabilityPredicate::any().is_any());
        assert!(!TraceabilityPredicate::new(Predicate::air()).is_any());

        let hatch_or_any = TraceabilityPredicate::new(Predicate::component("mbd:hatch"))
            .set_global_limits(1, 1)
            .or(Predicate::any());
        assert!(!hatch_or_any.is_any());
    }
}
