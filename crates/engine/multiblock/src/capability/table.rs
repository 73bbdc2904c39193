//! Per-controller table of capability proxies

use super::{Capability, CapabilityProxy, Io};
use crate::events::StructureEvents;
use crate::pattern::CapabilitySlot;
use crate::pos::BlockPos;
use crate::world::World;
use std::collections::{BTreeMap, HashMap};
use std::ops::ControlFlow;

type Bucket = BTreeMap<BlockPos, Box<dyn CapabilityProxy>>;

/// Proxies of a formed structure keyed by `(direction, capability)` then member position.
///
/// The table is rebuilt wholesale whenever the member set changes.
#[derive(Debug, Default)]
pub struct ProxyTable {
    owner: BlockPos,
    buckets: HashMap<(Io, Capability), Bucket>,
}

impl ProxyTable {
    pub fn new(owner: BlockPos) -> Self {
        Self {
            owner,
            buckets: HashMap::new(),
        }
    }

    /// Controller position the table belongs to
    pub fn owner(&self) -> BlockPos {
        self.owner
    }

    pub fn has_proxies(&self) -> bool {
        self.buckets.values().any(|bucket| !bucket.is_empty())
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, io: Io, capability: &Capability) -> bool {
        self.buckets
            .get(&(io, capability.clone()))
            .is_some_and(|bucket| !bucket.is_empty())
    }

    /// Register a proxy, replacing any proxy of the same member in that bucket
    pub fn insert(&mut self, io: Io, proxy: Box<dyn CapabilityProxy>) {
        let key = (io, proxy.capability().clone());
        self.buckets.entry(key).or_default().insert(proxy.pos(), proxy);
    }

    pub fn clear(&mut self) {
        self.buckets.clear();
    }

    /// Drop every proxy and bind fresh ones for `slots`.
    ///
    /// The direction of each slot may be overridden by the scripting hook.
    pub fn rebuild(&mut self, slots: &[CapabilitySlot], world: &dyn World, events: &dyn StructureEvents) {
        self.clear();
        for slot in slots {
            let io = events
                .select_capability_io(self.owner, slot.pos, &slot.capability, slot.io)
                .unwrap_or(slot.io);
            match world.create_proxy(slot.pos, &slot.capability, io) {
                Some(proxy) => self.insert(io, proxy),
                None => tracing::debug!(
                    controller = %self.owner,
                    pos = %slot.pos,
                    capability = %slot.capability,
                    "member exposes no proxy"
                ),
            }
        }
        tracing::debug!(controller = %self.owner, proxies = self.len(), "capability proxies rebuilt");
    }

    /// Proxies registered exactly under `(io, capability)`
    pub fn bucket(&self, io: Io, capability: &Capability) -> impl Iterator<Item = &dyn CapabilityProxy> {
        self.buckets
            .get(&(io, capability.clone()))
            .into_iter()
            .flat_map(|bucket| bucket.values().map(|proxy| proxy.as_ref()))
    }

    /// Same-direction proxies first, then `Io::Both` proxies
    pub fn resolve(&self, io: Io, capability: &Capability) -> impl Iterator<Item = &dyn CapabilityProxy> {
        let both = (io != Io::Both).then(|| self.bucket(Io::Both, capability));
        self.bucket(io, capability).chain(both.into_iter().flatten())
    }

    /// Mutable traversal in the same order as [`ProxyTable::resolve`]; stops on `Break`
    pub fn for_each_resolved_mut<F>(&mut self, io: Io, capability: &Capability, mut visit: F)
    where
        F: FnMut(&mut dyn CapabilityProxy) -> ControlFlow<()>,
    {
        let mut order = vec![io];
        if io != Io::Both {
            order.push(Io::Both);
        }
        for direction in order {
            let Some(bucket) = self.buckets.get_mut(&(direction, capability.clone())) else {
                continue;
            };
            for proxy in bucket.values_mut() {
                if visit(proxy.as_mut()).is_break() {
                    return;
                }
            }
        }
    }

    /// Mutable traversal of one exact bucket
    pub fn for_each_in_bucket_mut<F>(&mut self, io: Io, capability: &Capability, mut visit: F)
    where
        F: FnMut(&mut dyn CapabilityProxy),
    {
        if let Some(bucket) = self.buckets.get_mut(&(io, capability.clone())) {
            for proxy in bucket.values_mut() {
                visit(proxy.as_mut());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{ResourceStorage, StorageProxy};
    use crate::world::{GridWorld, Occupant};

    fn proxy(cap: Capability, pos: BlockPos) -> Box<dyn CapabilityProxy> {
        Box::new(StorageProxy::new(cap, pos, ResourceStorage::new(8).shared()))
    }

    #[test]
    fn test_resolve_orders_same_direction_before_both() {
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        table.insert(Io::Both, proxy(Capability::ITEM, BlockPos::new(0, 0, 1)));
        table.insert(Io::In, proxy(Capability::ITEM, BlockPos::new(0, 0, 9)));
        table.insert(Io::Out, proxy(Capability::ITEM, BlockPos::new(0, 0, 5)));

        let ins: Vec<_> = table.resolve(Io::In, &Capability::ITEM).map(|p| p.pos().z).collect();
        assert_eq!(ins, vec![9, 1]);
        let outs: Vec<_> = table.resolve(Io::Out, &Capability::ITEM).map(|p| p.pos().z).collect();
        assert_eq!(outs, vec![5, 1]);
        assert_eq!(table.resolve(Io::In, &Capability::FLUID).count(), 0);
    }

    #[test]
    fn test_insert_replaces_same_member() {
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        table.insert(Io::In, proxy(Capability::ITEM, BlockPos::new(1, 0, 0)));
        table.insert(Io::In, proxy(Capability::ITEM, BlockPos::new(1, 0, 0)));
        assert_eq!(table.len(), 1);
        assert!(table.contains(Io::In, &Capability::ITEM));
        assert!(!table.contains(Io::Out, &Capability::ITEM));

        table.clear();
        assert!(!table.has_proxies());
    }

    #[test]
    fn test_mut_traversal_breaks() {
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        table.insert(Io::In, proxy(Capability::ITEM, BlockPos::new(1, 0, 0)));
        table.insert(Io::Both, proxy(Capability::ITEM, BlockPos::new(2, 0, 0)));

        let mut seen = Vec::new();
        table.for_each_resolved_mut(Io::In, &Capability::ITEM, |p| {
            seen.push(p.pos().x);
            ControlFlow::Break(())
        });
        assert_eq!(seen, vec![1]);
    }

    /// Rebinds every input member as an output
    struct InputsAsOutputs;

    impl StructureEvents for InputsAsOutputs {
        fn select_capability_io(&self, _: BlockPos, _: BlockPos, _: &Capability, io: Io) -> Option<Io> {
            (io == Io::In).then_some(Io::Out)
        }
    }

    #[test]
    fn test_rebuild_honors_io_override() {
        let hatch = BlockPos::new(1, 0, 0);
        let mut world = GridWorld::default();
        world.set(hatch, Occupant::component("mbd:hatch").with_capability(Capability::ITEM));
        world.attach_storage(hatch, Capability::ITEM, ResourceStorage::new(8).shared());

        let slots = [CapabilitySlot {
            pos: hatch,
            capability: Capability::ITEM,
            io: Io::In,
        }];
        let mut table = ProxyTable::new(BlockPos::ORIGIN);
        table.rebuild(&slots, &world, &InputsAsOutputs);

        assert_eq!(table.len(), 1);
        assert!(table.contains(Io::Out, &Capability::ITEM));
        assert!(!table.contains(Io::In, &Capability::ITEM));
        let outs: Vec<_> = table.bucket(Io::Out, &Capability::ITEM).map(|p| p.pos()).collect();
        assert_eq!(outs, vec![hatch]);
    }
}
