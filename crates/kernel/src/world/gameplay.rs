//! Interactions evaluated after sensors: keys, spikes and end blocks.
//!
//! Removals and spawned effects are queued and land in the next apply phase.

use echostep_common::{EntityId, IVec2, Rect};
use echostep_ecs::Entity;

use super::World;
use crate::events::WorldEvent;
use crate::prefab::{self, INDICATOR_SIZE};

impl World {
    pub(super) fn interact(&mut self) {
        self.collect_keys();
        self.touch_spikes();
        self.reach_ends();
    }

    /// Players any sensor of `owner` reports, sorted and deduplicated.
    fn players_touching(&self, owner: EntityId) -> Vec<EntityId> {
        let Some(entity) = self.entities.get(&owner) else {
            return Vec::new();
        };
        let mut found: Vec<EntityId> = entity
            .sensor_colliders()
            .flat_map(|c| self.sensors.hits(c.id).iter().copied())
            .filter(|id| self.players.contains_key(id) && !self.pending_remove.contains(id))
            .collect();
        found.sort();
        found.dedup();
        found
    }

    fn spawn_animation(&mut self, at: Rect) {
        let fx = prefab::animation(&mut self.ids, at, self.config.animation_ticks);
        self.spawn(fx);
    }

    fn collect_keys(&mut self) {
        let keys: Vec<(EntityId, u32)> = self
            .components
            .keys()
            .iter()
            .map(|(id, k)| (*id, k.toggle_idx))
            .collect();
        for (key, toggle_idx) in keys {
            let Some(&actor) = self.players_touching(key).first() else {
                continue;
            };
            tracing::debug!(%key, %actor, toggle_idx, "key collected");
            self.events.push(WorldEvent::KeyCollected { key, actor });
            for (door, open) in self.components.toggle_doors(toggle_idx) {
                if let Some(e) = self.entities.get_mut(&door) {
                    for c in e.colliders.iter_mut().filter(|c| c.is_solid()) {
                        c.enabled = !open;
                    }
                }
                self.events.push(WorldEvent::DoorToggled { door, open });
            }
            self.components.remove_key(key);
            self.pending_remove.insert(key);
            if let Some(at) = self.entities.get(&key).map(Entity::aabb) {
                self.spawn_animation(at);
            }
        }
    }

    fn touch_spikes(&mut self) {
        let spikes: Vec<EntityId> = self.components.spikes().keys().copied().collect();
        for spike in spikes {
            for actor in self.players_touching(spike) {
                tracing::debug!(%actor, by = %spike, "actor killed");
                self.events.push(WorldEvent::ActorKilled { actor, by: spike });
                self.pending_remove.insert(actor);
                if let Some(at) = self.entities.get(&actor).map(Entity::aabb) {
                    self.spawn_animation(at);
                }
            }
        }
    }

    fn reach_ends(&mut self) {
        let ends: Vec<(EntityId, u32)> = self
            .components
            .ends()
            .iter()
            .map(|(id, z)| (*id, z.player_id))
            .collect();
        for (end, player_id) in ends {
            for actor in self.players_touching(end) {
                let matching = self
                    .components
                    .player_tag(actor)
                    .is_some_and(|tag| tag.player_id == player_id);
                if !matching {
                    continue;
                }
                let newly = self
                    .components
                    .end_mut(end)
                    .is_some_and(|zone| zone.satisfied.insert(actor));
                if !newly {
                    continue;
                }
                tracing::debug!(%actor, %end, player_id, "end satisfied");
                self.events.push(WorldEvent::ActorSatisfiedEnd { actor, end, player_id });
                if let Some(block) = self.entities.get(&end).map(Entity::aabb) {
                    let origin = IVec2::new(
                        block.x + (block.w - INDICATOR_SIZE.x) / 2,
                        block.y - 2 * INDICATOR_SIZE.y - 4,
                    );
                    let marker = prefab::indicator(&mut self.ids, origin, self.config.indicator_ticks);
                    self.spawn(marker);
                }
            }
        }
    }
}
