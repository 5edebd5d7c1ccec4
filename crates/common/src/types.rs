use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an entity in the world.
///
/// Ids are assigned monotonically by an [`IdAllocator`], so ordering by id is
/// ordering by creation. Every deterministic iteration in the kernel relies on
/// this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Stable identifier of a collider, unique across the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub u64);

impl fmt::Display for ColliderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Monotonic id source for entities and colliders.
///
/// A fresh world starts both counters at 1, so two worlds built from the same
/// level assign the same ids in the same order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdAllocator {
    next_entity: u64,
    next_collider: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self {
            next_entity: 1,
            next_collider: 1,
        }
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(&mut self) -> EntityId {
        let id = EntityId(self.next_entity);
        self.next_entity += 1;
        id
    }

    pub fn collider(&mut self) -> ColliderId {
        let id = ColliderId(self.next_collider);
        self.next_collider += 1;
        id
    }
}

/// Resolver priority bucket. Smaller groups are solved first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhysicsGroup(pub i32);

impl PhysicsGroup {
    pub const ENVIRONMENT: Self = Self(5);
    pub const ACTOR: Self = Self(10);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocator_is_monotonic() {
        let mut ids = IdAllocator::new();
        let a = ids.entity();
        let b = ids.entity();
        assert!(a < b);
        assert_eq!(a, EntityId(1));

        let c = ids.collider();
        let d = ids.collider();
        assert_eq!(c, ColliderId(1));
        assert_eq!(d, ColliderId(2));
    }

    #[test]
    fn fresh_allocators_agree() {
        let mut x = IdAllocator::new();
        let mut y = IdAllocator::new();
        for _ in 0..10 {
            assert_eq!(x.entity(), y.entity());
        }
    }

    #[test]
    fn physics_groups_order() {
        assert!(PhysicsGroup::ENVIRONMENT < PhysicsGroup::ACTOR);
    }
}
