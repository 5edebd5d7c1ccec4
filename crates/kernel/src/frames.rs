//! Frame-of-reference parenting for riders on blocks.

use echostep_common::{ColliderId, EntityId, rect_overlap_area};
use echostep_ecs::Entity;
use std::collections::{BTreeMap, BTreeSet};

use crate::sensors::SensorState;

/// Child → parent links plus the reverse lookup, so removing a parent can
/// clear its children without scanning every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameGraph {
    parent_of: BTreeMap<EntityId, EntityId>,
    children: BTreeMap<EntityId, BTreeSet<EntityId>>,
}

impl FrameGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parent(&self, child: EntityId) -> Option<EntityId> {
        self.parent_of.get(&child).copied()
    }

    pub fn children(&self, parent: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.children.get(&parent).into_iter().flatten().copied()
    }

    /// Link or unlink `child`. Returns whether the link changed.
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> bool {
        let old = self.parent(child);
        if old == parent {
            return false;
        }
        if let Some(old) = old {
            self.detach(old, child);
        }
        match parent {
            Some(p) => {
                self.parent_of.insert(child, p);
                self.children.entry(p).or_default().insert(child);
            }
            None => {
                self.parent_of.remove(&child);
            }
        }
        true
    }

    fn detach(&mut self, parent: EntityId, child: EntityId) {
        if let Some(set) = self.children.get_mut(&parent) {
            set.remove(&child);
            if set.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    /// Forget `entity` as both child and parent. Returns the children whose
    /// link was nulled, in id order.
    pub fn remove(&mut self, entity: EntityId) -> Vec<EntityId> {
        if let Some(parent) = self.parent_of.remove(&entity) {
            self.detach(parent, entity);
        }
        let orphans: Vec<EntityId> = self
            .children
            .remove(&entity)
            .map(|set| set.into_iter().collect())
            .unwrap_or_default();
        for child in &orphans {
            self.parent_of.remove(child);
        }
        orphans
    }

    pub fn len(&self) -> usize {
        self.parent_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent_of.is_empty()
    }
}

/// Block under `actor` with the greatest foot-sensor overlap area. Ties go to
/// the lower entity id.
pub fn choose_parent(
    actor: &Entity,
    feet: &[ColliderId],
    sensors: &SensorState,
    entities: &BTreeMap<EntityId, Entity>,
) -> Option<EntityId> {
    let actor_px = actor.pixel_pos();
    let mut area: BTreeMap<EntityId, i64> = BTreeMap::new();
    for foot in feet {
        let Some(sensor) = actor.collider(*foot) else {
            continue;
        };
        let foot_rect = sensor.world_aabb(actor_px);
        for block_id in sensors.hits(*foot) {
            let Some(block) = entities.get(block_id) else {
                continue;
            };
            let block_px = block.pixel_pos();
            let best = block
                .solid_colliders()
                .map(|c| rect_overlap_area(&foot_rect, &c.world_aabb(block_px)))
                .max()
                .unwrap_or(0);
            *area.entry(*block_id).or_default() += best;
        }
    }
    let mut chosen: Option<(EntityId, i64)> = None;
    for (id, a) in area {
        if a > 0 && chosen.is_none_or(|(_, best)| a > best) {
            chosen = Some((id, a));
        }
    }
    chosen.map(|(id, _)| id)
}
