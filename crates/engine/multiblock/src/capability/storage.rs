//! Stock resource storage and the proxy that exposes it to recipes

use super::{Capability, CapabilityProxy, Io};
use crate::pos::BlockPos;
use crate::recipe::{Ingredient, Recipe};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Storage shared between a world member and the proxies bound to it
pub type SharedStorage = Rc<RefCell<ResourceStorage>>;

/// Amount-per-resource container with a total capacity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceStorage {
    amounts: BTreeMap<String, u64>,
    capacity: u64,
}

impl ResourceStorage {
    pub fn new(capacity: u64) -> Self {
        Self {
            amounts: BTreeMap::new(),
            capacity,
        }
    }

    pub fn with(mut self, id: impl Into<String>, amount: u64) -> Self {
        self.insert(&Ingredient::new(id, amount));
        self
    }

    pub fn shared(self) -> SharedStorage {
        Rc::new(RefCell::new(self))
    }

    pub fn amount(&self, id: &str) -> u64 {
        self.amounts.get(id).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.amounts.values().sum()
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn contents(&self) -> impl Iterator<Item = (&str, u64)> {
        self.amounts.iter().map(|(id, amount)| (id.as_str(), *amount))
    }

    /// Set the stored amount of `id`, ignoring capacity
    pub fn set(&mut self, id: impl Into<String>, amount: u64) {
        let id = id.into();
        if amount == 0 {
            self.amounts.remove(&id);
        } else {
            self.amounts.insert(id, amount);
        }
    }

    /// Take up to `wanted.amount`; returns how much was missing
    pub fn extract(&mut self, wanted: &Ingredient) -> u64 {
        let have = self.amount(&wanted.id);
        let taken = have.min(wanted.amount);
        self.set(wanted.id.clone(), have - taken);
        wanted.amount - taken
    }

    /// Store up to the free capacity; returns how much did not fit
    pub fn insert(&mut self, offered: &Ingredient) -> u64 {
        let free = self.capacity.saturating_sub(self.total());
        let stored = free.min(offered.amount);
        let have = self.amount(&offered.id);
        self.set(offered.id.clone(), have + stored);
        offered.amount - stored
    }

    /// Apply `left` against this storage and return the residual
    fn apply(&mut self, io: Io, left: Vec<Ingredient>) -> Vec<Ingredient> {
        left.into_iter()
            .filter_map(|ingredient| {
                let missing = match io {
                    Io::In => self.extract(&ingredient),
                    Io::Out => self.insert(&ingredient),
                    Io::Both => ingredient.amount,
                };
                (missing > 0).then(|| Ingredient::new(ingredient.id, missing))
            })
            .collect()
    }
}

/// Proxy over a [`ResourceStorage`] owned by a member
#[derive(Debug)]
pub struct StorageProxy {
    capability: Capability,
    pos: BlockPos,
    storage: SharedStorage,
    working: bool,
}

impl StorageProxy {
    pub fn new(capability: Capability, pos: BlockPos, storage: SharedStorage) -> Self {
        Self {
            capability,
            pos,
            storage,
            working: false,
        }
    }

    /// Whether a recipe using this proxy is currently running
    pub fn is_working(&self) -> bool {
        self.working
    }
}

impl CapabilityProxy for StorageProxy {
    fn capability(&self) -> &Capability {
        &self.capability
    }

    fn pos(&self) -> BlockPos {
        self.pos
    }

    fn search_recipe(&self, io: Io, _recipe: &Recipe, left: Vec<Ingredient>) -> Vec<Ingredient> {
        let mut copy = self.storage.borrow().clone();
        copy.apply(io, left)
    }

    fn handle_recipe(&mut self, io: Io, _recipe: &Recipe, left: Vec<Ingredient>) -> Vec<Ingredient> {
        self.storage.borrow_mut().apply(io, left)
    }

    fn pre_working(&mut self, _holder: BlockPos, _io: Io, _recipe: &Recipe) {
        self.working = true;
    }

    fn post_working(&mut self, _holder: BlockPos, _io: Io, _recipe: &Recipe) {
        self.working = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_reports_missing() {
        let mut storage = ResourceStorage::new(64).with("iron", 3);
        assert_eq!(storage.extract(&Ingredient::new("iron", 5)), 2);
        assert_eq!(storage.amount("iron"), 0);
        assert_eq!(storage.contents().count(), 0);
    }

    #[test]
    fn test_insert_respects_capacity() {
        let mut storage = ResourceStorage::new(10).with("gold", 8);
        assert_eq!(storage.insert(&Ingredient::new("ingot", 5)), 3);
        assert_eq!(storage.amount("ingot"), 2);
        assert_eq!(storage.total(), 10);
    }

    #[test]
    fn test_search_does_not_mutate() {
        let storage = ResourceStorage::new(64).with("iron", 4).shared();
        let proxy = StorageProxy::new(Capability::ITEM, BlockPos::ORIGIN, storage.clone());
        let recipe = Recipe::builder("check").build();

        let left = proxy.search_recipe(Io::In, &recipe, vec![Ingredient::new("iron", 3)]);
        assert!(left.is_empty());
        assert_eq!(storage.borrow().amount("iron"), 4);
    }
}
