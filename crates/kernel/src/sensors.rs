//! Sensor overlap sets.
//!
//! Every enabled sensor collider reports the entities whose solid colliders it
//! overlaps. Sensors never push anything.

use echostep_common::{ColliderId, EntityId};
use echostep_ecs::{ColliderMask, Entity};
use echostep_spatial::SpatialGrid;
use std::collections::{BTreeMap, BTreeSet};

/// Sensor collider id → sorted ids of the entities it overlaps this tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorState {
    overlaps: BTreeMap<ColliderId, Vec<EntityId>>,
}

impl SensorState {
    /// Overlaps for a sensor. Disabled or unknown sensors report nothing.
    pub fn hits(&self, sensor: ColliderId) -> &[EntityId] {
        self.overlaps.get(&sensor).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, sensor: ColliderId, entity: EntityId) -> bool {
        self.hits(sensor).binary_search(&entity).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColliderId, &[EntityId])> {
        self.overlaps.iter().map(|(id, v)| (*id, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.overlaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overlaps.is_empty()
    }

    /// Recompute every enabled sensor in ascending entity id order.
    ///
    /// Candidates come from the spatial index; sensors that detect actors
    /// also test every dynamic entity.
    pub fn compute(
        entities: &BTreeMap<EntityId, Entity>,
        grid: &SpatialGrid,
        dynamic: &BTreeSet<EntityId>,
    ) -> Self {
        let mut overlaps = BTreeMap::new();
        for (owner_id, owner) in entities {
            let owner_px = owner.pixel_pos();
            for sensor in owner.sensor_colliders() {
                let mut candidates = grid.query(&sensor.world_aabb(owner_px));
                if sensor.collides.contains(ColliderMask::Actor) {
                    candidates.extend(dynamic.iter().copied());
                }
                let hits: Vec<EntityId> = candidates
                    .into_iter()
                    .filter(|id| id != owner_id)
                    .filter(|id| {
                        entities.get(id).is_some_and(|other| {
                            let other_px = other.pixel_pos();
                            other.solid_colliders().any(|c| {
                                sensor.collides_with(c) && sensor.is_overlapping(owner_px, c, other_px)
                            })
                        })
                    })
                    .collect();
                overlaps.insert(sensor.id, hits);
            }
        }
        Self { overlaps }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echostep_common::{IVec2, PhysicsGroup, Rect};
    use echostep_ecs::{Collider, EntityKind, MaskSet};

    fn block(id: u64, cid: u64, r: Rect) -> Entity {
        Entity::new(EntityId(id), EntityKind::Block, IVec2::new(r.x, r.y) * 10, IVec2::new(r.w, r.h))
            .with_collider(Collider::rect(ColliderId(cid), Rect::new(0, 0, r.w, r.h), ColliderMask::Block).unwrap())
    }

    fn world() -> (BTreeMap<EntityId, Entity>, SpatialGrid, BTreeSet<EntityId>) {
        let mut entities = BTreeMap::new();
        entities.insert(EntityId(2), block(2, 1, Rect::new(0, 160, 64, 16)));
        entities.insert(EntityId(1), block(1, 2, Rect::new(40, 160, 64, 16)));
        let actor = Entity::new(EntityId(3), EntityKind::Player, IVec2::new(480, 1440), IVec2::new(12, 16))
            .with_collider(
                Collider::rect(ColliderId(3), Rect::new(0, 0, 12, 16), ColliderMask::Actor)
                    .unwrap()
                    .colliding_with(MaskSet::terrain()),
            )
            .with_collider(
                Collider::rect(ColliderId(4), Rect::new(1, 16, 10, 1), ColliderMask::Sensor)
                    .unwrap()
                    .colliding_with(MaskSet::of(&[ColliderMask::Block])),
            )
            .with_collider(
                Collider::rect(ColliderId(5), Rect::new(12, 2, 1, 12), ColliderMask::Sensor)
                    .unwrap()
                    .colliding_with(MaskSet::of(&[ColliderMask::Block])),
            )
            .in_group(PhysicsGroup::ACTOR);
        entities.insert(EntityId(3), actor);
        let strip = Entity::new(EntityId(4), EntityKind::End, IVec2::new(480, 1600), IVec2::new(16, 16))
            .with_collider(
                Collider::rect(ColliderId(6), Rect::new(0, -1, 16, 1), ColliderMask::Sensor)
                    .unwrap()
                    .colliding_with(MaskSet::of(&[ColliderMask::Actor])),
            );
        entities.insert(EntityId(4), strip);

        let mut grid = SpatialGrid::new(32).unwrap();
        for (id, e) in &entities {
            if !e.is_dynamic() && e.has_solid() {
                grid.insert(*id, e.collider_bounds());
            }
        }
        let dynamic = entities.values().filter(|e| e.is_dynamic()).map(|e| e.id).collect();
        (entities, grid, dynamic)
    }

    #[test]
    fn foot_sees_both_blocks_sorted() {
        let (entities, grid, dynamic) = world();
        let state = SensorState::compute(&entities, &grid, &dynamic);
        assert_eq!(state.hits(ColliderId(4)), &[EntityId(1), EntityId(2)]);
        assert!(state.contains(ColliderId(4), EntityId(2)));
        assert!(state.hits(ColliderId(5)).is_empty());
    }

    #[test]
    fn actor_sensors_find_dynamic_entities() {
        let (entities, grid, dynamic) = world();
        let state = SensorState::compute(&entities, &grid, &dynamic);
        assert_eq!(state.hits(ColliderId(6)), &[EntityId(3)]);
    }

    #[test]
    fn disabled_sensor_has_no_entry() {
        let (mut entities, grid, dynamic) = world();
        if let Some(actor) = entities.get_mut(&EntityId(3)) {
            actor.collider_mut(ColliderId(4)).unwrap().enabled = false;
        }
        let state = SensorState::compute(&entities, &grid, &dynamic);
        assert!(state.hits(ColliderId(4)).is_empty());
        assert!(state.iter().all(|(id, _)| id != ColliderId(4)));
        assert_eq!(state.len(), 2);
    }
}
