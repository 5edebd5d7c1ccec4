//! Gameplay components, stored per type in `BTreeMap`s keyed by entity.

use echostep_common::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Where a character enters the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartMarker {
    pub player_id: u32,
    pub x_dir: i32,
}

/// Goal for one character. `satisfied` holds actors that already reached it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndZone {
    pub player_id: u32,
    pub satisfied: BTreeSet<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorState {
    pub toggle_idx: u32,
    pub inverted: bool,
    pub open: bool,
}

impl DoorState {
    pub fn new(toggle_idx: u32, inverted: bool) -> Self {
        Self {
            toggle_idx,
            inverted,
            open: inverted,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyState {
    pub toggle_idx: u32,
}

/// Side of a spike strip the points face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpikeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl SpikeDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spikes {
    pub direction: SpikeDirection,
}

/// Self-removal countdown in ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifetime {
    pub remaining: u32,
}

/// Which character a player entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerTag {
    pub player_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentKind {
    Start,
    End,
    Door,
    Key,
    Spikes,
    Lifetime,
    Player,
}

/// Events produced by component mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentEvent {
    Added { entity: EntityId, kind: ComponentKind },
    Removed { entity: EntityId, kind: ComponentKind },
}

macro_rules! storage {
    ($field:ident, $ty:ty, $kind:expr, $set:ident, $get:ident, $get_mut:ident, $remove:ident) => {
        pub fn $set(&mut self, entity: EntityId, value: $ty) {
            if self.$field.insert(entity, value).is_none() {
                self.events.push(ComponentEvent::Added { entity, kind: $kind });
            }
        }

        pub fn $get(&self, entity: EntityId) -> Option<&$ty> {
            self.$field.get(&entity)
        }

        pub fn $get_mut(&mut self, entity: EntityId) -> Option<&mut $ty> {
            self.$field.get_mut(&entity)
        }

        pub fn $remove(&mut self, entity: EntityId) -> Option<$ty> {
            let removed = self.$field.remove(&entity);
            if removed.is_some() {
                self.events.push(ComponentEvent::Removed { entity, kind: $kind });
            }
            removed
        }

        pub fn $field(&self) -> &BTreeMap<EntityId, $ty> {
            &self.$field
        }
    };
}

/// Deterministic component storage.
///
/// Every map is a `BTreeMap`, so iteration is in entity-id order. Adding or
/// removing a component logs a [`ComponentEvent`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentStore {
    starts: BTreeMap<EntityId, StartMarker>,
    ends: BTreeMap<EntityId, EndZone>,
    doors: BTreeMap<EntityId, DoorState>,
    keys: BTreeMap<EntityId, KeyState>,
    spikes: BTreeMap<EntityId, Spikes>,
    lifetimes: BTreeMap<EntityId, Lifetime>,
    player_tags: BTreeMap<EntityId, PlayerTag>,
    #[serde(skip)]
    events: Vec<ComponentEvent>,
}

impl ComponentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain_events(&mut self) -> Vec<ComponentEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[ComponentEvent] {
        &self.events
    }

    storage!(starts, StartMarker, ComponentKind::Start, set_start, start, start_mut, remove_start);
    storage!(ends, EndZone, ComponentKind::End, set_end, end, end_mut, remove_end);
    storage!(doors, DoorState, ComponentKind::Door, set_door, door, door_mut, remove_door);
    storage!(keys, KeyState, ComponentKind::Key, set_key, key, key_mut, remove_key);
    storage!(spikes, Spikes, ComponentKind::Spikes, set_spikes, spike, spike_mut, remove_spikes);
    storage!(
        lifetimes,
        Lifetime,
        ComponentKind::Lifetime,
        set_lifetime,
        lifetime,
        lifetime_mut,
        remove_lifetime
    );
    storage!(
        player_tags,
        PlayerTag,
        ComponentKind::Player,
        set_player_tag,
        player_tag,
        player_tag_mut,
        remove_player_tag
    );

    /// Remove all components for an entity.
    pub fn remove_entity(&mut self, entity: EntityId) {
        self.remove_start(entity);
        self.remove_end(entity);
        self.remove_door(entity);
        self.remove_key(entity);
        self.remove_spikes(entity);
        self.remove_lifetime(entity);
        self.remove_player_tag(entity);
        tracing::trace!(%entity, "components cleared");
    }

    /// Count down every lifetime and return the entities that just expired,
    /// in id order. Expired lifetimes are removed.
    pub fn tick_lifetimes(&mut self) -> Vec<EntityId> {
        let mut expired = Vec::new();
        for (id, life) in self.lifetimes.iter_mut() {
            life.remaining = life.remaining.saturating_sub(1);
            if life.remaining == 0 {
                expired.push(*id);
            }
        }
        for id in &expired {
            self.remove_lifetime(*id);
        }
        expired
    }

    /// Flip every door on `toggle_idx`. Returns `(door, now_open)` in id order.
    pub fn toggle_doors(&mut self, toggle_idx: u32) -> Vec<(EntityId, bool)> {
        self.doors
            .iter_mut()
            .filter(|(_, d)| d.toggle_idx == toggle_idx)
            .map(|(id, d)| {
                d.open = !d.open;
                (*id, d.open)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_remove_logs_events() {
        let mut store = ComponentStore::new();
        let id = EntityId(4);
        store.set_key(id, KeyState { toggle_idx: 1 });
        store.set_key(id, KeyState { toggle_idx: 2 });
        assert_eq!(store.key(id), Some(&KeyState { toggle_idx: 2 }));
        store.remove_key(id);
        assert!(store.key(id).is_none());
        assert_eq!(
            store.drain_events(),
            vec![
                ComponentEvent::Added { entity: id, kind: ComponentKind::Key },
                ComponentEvent::Removed { entity: id, kind: ComponentKind::Key },
            ]
        );
        assert!(store.events().is_empty());
    }

    #[test]
    fn remove_entity_clears_all() {
        let mut store = ComponentStore::new();
        let id = EntityId(9);
        store.set_door(id, DoorState::new(0, false));
        store.set_lifetime(id, Lifetime { remaining: 3 });
        store.set_end(id, EndZone { player_id: 1, ..Default::default() });
        store.remove_entity(id);
        assert!(store.door(id).is_none());
        assert!(store.lifetime(id).is_none());
        assert!(store.end(id).is_none());
    }

    #[test]
    fn lifetimes_expire_in_id_order() {
        let mut store = ComponentStore::new();
        store.set_lifetime(EntityId(7), Lifetime { remaining: 1 });
        store.set_lifetime(EntityId(2), Lifetime { remaining: 1 });
        store.set_lifetime(EntityId(5), Lifetime { remaining: 2 });
        assert_eq!(store.tick_lifetimes(), vec![EntityId(2), EntityId(7)]);
        assert_eq!(store.tick_lifetimes(), vec![EntityId(5)]);
        assert!(store.lifetimes().is_empty());
    }

    #[test]
    fn doors_toggle_by_index() {
        let mut store = ComponentStore::new();
        store.set_door(EntityId(1), DoorState::new(0, false));
        store.set_door(EntityId(2), DoorState::new(0, true));
        store.set_door(EntityId(3), DoorState::new(1, false));
        let flipped = store.toggle_doors(0);
        assert_eq!(flipped, vec![(EntityId(1), true), (EntityId(2), false)]);
        assert!(!store.door(EntityId(3)).unwrap().open);
    }

    #[test]
    fn deterministic_iteration_order() {
        let mut store = ComponentStore::new();
        for n in [9u64, 3, 7, 1] {
            store.set_player_tag(EntityId(n), PlayerTag { player_id: n as u32 });
        }
        let keys: Vec<_> = store.player_tags().keys().copied().collect();
        assert_eq!(keys, vec![EntityId(1), EntityId(3), EntityId(7), EntityId(9)]);
    }
}
