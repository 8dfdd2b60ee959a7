//! Entity stores: keyed collections of simulated entities.
//!
//! Entities live as components in a private `bevy_ecs` [`World`]; the store
//! keeps an id index into it plus the insertion order, which is the iteration
//! order of every full-collection walk. Removing an entity keeps the relative
//! order of the rest, so ticks, routing batches and score records come out in
//! the same order for the same inputs.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Debug;
use std::hash::Hash;

use bevy_ecs::prelude::{Component, Entity, World};

/// An entity a store can track by id.
pub trait Tracked: Component {
    type Id: Clone + Eq + Hash + Debug;
    type Snapshot;

    fn id(&self) -> &Self::Id;
    fn snapshot(&self) -> Self::Snapshot;
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    entity: Entity,
    seq: u64,
}

pub struct EntityStore<T: Tracked> {
    world: World,
    index: HashMap<T::Id, Slot>,
    /// Insertion sequence number to id.
    order: BTreeMap<u64, T::Id>,
    next_seq: u64,
}

impl<T: Tracked> Default for EntityStore<T> {
    fn default() -> Self {
        Self {
            world: World::new(),
            index: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
        }
    }
}

impl<T: Tracked> EntityStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id. A replaced entity keeps its position in the
    /// iteration order and is returned.
    pub fn insert(&mut self, value: T) -> Option<T> {
        let id = value.id().clone();
        if let Some(slot) = self.index.get(&id) {
            if let Some(mut current) = self.world.get_mut::<T>(slot.entity) {
                return Some(std::mem::replace(&mut *current, value));
            }
        }
        let entity = self.world.spawn(value).id();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(id.clone(), Slot { entity, seq });
        self.order.insert(seq, id);
        None
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        let slot = self.index.get(id)?;
        self.world.get::<T>(slot.entity)
    }

    pub fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        let slot = self.index.get(id)?;
        self.world.get_mut::<T>(slot.entity).map(|value| value.into_inner())
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.index.contains_key(id)
    }

    /// Ids in insertion order. Owned so callers can mutate the store while walking it.
    pub fn ids(&self) -> Vec<T::Id> {
        self.order.values().cloned().collect()
    }

    /// Entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.values().filter_map(move |id| self.get(id))
    }

    pub fn remove(&mut self, id: &T::Id) -> Option<T> {
        let slot = self.index.remove(id)?;
        self.order.remove(&slot.seq);
        let mut entity_mut = self.world.get_entity_mut(slot.entity)?;
        let value = entity_mut.take::<T>();
        entity_mut.despawn();
        value
    }

    /// Visit every entity mutably in insertion order, dropping the ones for
    /// which `keep` returns `false`. One pass over the store.
    pub fn retain(&mut self, mut keep: impl FnMut(&mut T) -> bool) {
        let world = &mut self.world;
        let index = &mut self.index;
        self.order.retain(|_, id| {
            let Some(slot) = index.get(&*id).copied() else {
                return false;
            };
            let kept = match world.get_mut::<T>(slot.entity) {
                Some(value) => keep(value.into_inner()),
                None => false,
            };
            if !kept {
                index.remove(&*id);
                world.despawn(slot.entity);
            }
            kept
        });
    }

    pub fn clear(&mut self) {
        self.world = World::new();
        self.index.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Snapshots of every tracked entity, in insertion order.
    pub fn snapshot(&self) -> Vec<T::Snapshot> {
        self.iter().map(Tracked::snapshot).collect()
    }
}
