//! The authoritative world and its fixed-step tick.

mod gameplay;

use echostep_common::{EntityId, IVec2, IdAllocator, PhysicsGroup, Rect, Velocity, pixel_of, subpixel_of};
use echostep_ecs::{ComponentStore, Entity, EntityKind};
use echostep_input::{ActionSet, Playback, PlaybackController, Recording, RecordingController};
use echostep_spatial::{SpatialError, SpatialGrid};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::blueprint::{EntitySpec, LevelSpec, SpecError, spike_direction};
use crate::config::WorldConfig;
use crate::events::WorldEvent;
use crate::frames::{FrameGraph, choose_parent};
use crate::moving_block::MovingPath;
use crate::player::{Contacts, Driver, PlayerController};
use crate::prefab::{self, Component, Prefab};
use crate::resolver::{Obstacle, ResolveError, ResolverSettings, resolve};
use crate::sensors::SensorState;
use crate::tuning::{PlayerPhysics, TuningError};

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error(transparent)]
    Grid(#[from] SpatialError),
    #[error(transparent)]
    Tuning(#[from] TuningError),
    #[error(transparent)]
    Spec(#[from] SpecError),
}

/// Render handoff for one entity at a tick boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySnapshot {
    pub id: EntityId,
    pub kind: Option<EntityKind>,
    /// Top-left in pixels.
    pub pixel: IVec2,
    /// Top-left in sub-pixels.
    pub pos: IVec2,
    pub vel: Velocity,
    pub size: IVec2,
    pub parent: Option<EntityId>,
}

#[derive(Debug, Clone)]
struct PendingSpawn {
    prefab: Prefab,
    driver: Driver,
}

/// The authoritative world state.
///
/// Every mutation goes through an explicit operation or the tick. All maps
/// are `BTreeMap`s, so iteration is in entity-id order and two worlds fed the
/// same level and inputs stay bit-identical.
#[derive(Debug, Clone)]
pub struct World {
    config: WorldConfig,
    physics: PlayerPhysics,
    ids: IdAllocator,
    entities: BTreeMap<EntityId, Entity>,
    components: ComponentStore,
    players: BTreeMap<EntityId, PlayerController>,
    movers: BTreeMap<EntityId, MovingPath>,
    pending_add: Vec<PendingSpawn>,
    pending_remove: BTreeSet<EntityId>,
    grid: SpatialGrid,
    sensors: SensorState,
    frames: FrameGraph,
    recorder: Option<RecordingController>,
    events: Vec<WorldEvent>,
    tick: u64,
}

impl World {
    /// Empty world at tick 0.
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        let physics = config.player.compile()?;
        let grid = SpatialGrid::new(config.grid_cell_px)?;
        Ok(Self {
            config,
            physics,
            ids: IdAllocator::new(),
            entities: BTreeMap::new(),
            components: ComponentStore::new(),
            players: BTreeMap::new(),
            movers: BTreeMap::new(),
            pending_add: Vec::new(),
            pending_remove: BTreeSet::new(),
            grid,
            sensors: SensorState::default(),
            frames: FrameGraph::new(),
            recorder: None,
            events: Vec::new(),
            tick: 0,
        })
    }

    /// Build a world from a level. Entities are applied immediately, so the
    /// world is populated before the first tick. Entities that fail to build
    /// are logged and skipped.
    pub fn from_level(config: WorldConfig, level: &LevelSpec) -> Result<Self, WorldError> {
        Self::from_specs(config, &level.entities)
    }

    pub fn from_specs<'a>(
        config: WorldConfig,
        specs: impl IntoIterator<Item = &'a EntitySpec>,
    ) -> Result<Self, WorldError> {
        let mut world = Self::new(config)?;
        for spec in specs {
            if let Err(error) = world.spawn_spec(spec) {
                tracing::warn!(kind = spec.type_name(), %error, "entity not spawned");
            }
        }
        world.apply_pending();
        Ok(world)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Current tick. The next call to [`World::step`] runs this tick.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> &BTreeMap<EntityId, Entity> {
        &self.entities
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn components(&self) -> &ComponentStore {
        &self.components
    }

    pub fn sensors(&self) -> &SensorState {
        &self.sensors
    }

    pub fn frames(&self) -> &FrameGraph {
        &self.frames
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn player(&self, id: EntityId) -> Option<&PlayerController> {
        self.players.get(&id)
    }

    /// Player entity ids in ascending order.
    pub fn players(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.players.keys().copied()
    }

    /// First player driven by the host's input.
    pub fn live_player(&self) -> Option<EntityId> {
        self.players.iter().find(|(_, p)| p.is_live()).map(|(id, _)| *id)
    }

    pub fn moving_path(&self, id: EntityId) -> Option<&MovingPath> {
        self.movers.get(&id)
    }

    /// What the player's sensors reported at the end of the last tick.
    pub fn player_contacts(&self, id: EntityId) -> Option<Contacts> {
        self.players
            .get(&id)
            .map(|p| Contacts::read(&self.sensors, &p.sensors))
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[WorldEvent] {
        &self.events
    }

    /// Input captured so far for the live character.
    pub fn recording(&self) -> Option<Recording> {
        self.recorder.as_ref().map(RecordingController::snapshot)
    }

    /// Stop recording and hand back the captured input.
    pub fn take_recording(&mut self) -> Option<Recording> {
        self.recorder.take().map(RecordingController::finish)
    }

    /// Queue a prefab for the next apply phase. The id is assigned now.
    fn spawn(&mut self, prefab: Prefab) -> EntityId {
        self.queue(prefab, Driver::Idle)
    }

    fn queue(&mut self, prefab: Prefab, driver: Driver) -> EntityId {
        let id = prefab.entity.id;
        self.pending_add.push(PendingSpawn { prefab, driver });
        id
    }

    /// Queue a player standing at `origin` (pixels).
    pub fn spawn_player(
        &mut self,
        origin: IVec2,
        player_id: u32,
        x_dir: i32,
        driver: Driver,
    ) -> Result<EntityId, SpecError> {
        let prefab = prefab::player(&mut self.ids, origin, player_id, x_dir)?;
        Ok(self.queue(prefab, driver))
    }

    /// Queue a replaying player.
    pub fn spawn_playback(
        &mut self,
        origin: IVec2,
        player_id: u32,
        x_dir: i32,
        recording: Recording,
    ) -> Result<EntityId, SpecError> {
        self.spawn_player(origin, player_id, x_dir, Driver::Playback(PlaybackController::new(recording)))
    }

    /// Queue the entity a blueprint describes. `player` specs become live
    /// players.
    pub fn spawn_spec(&mut self, spec: &EntitySpec) -> Result<EntityId, SpecError> {
        spec.validate()?;
        let ids = &mut self.ids;
        let prefab = match spec {
            EntitySpec::Block { x, y, w, h, .. } => prefab::block(ids, Rect::new(*x, *y, *w, *h))?,
            EntitySpec::SlopedBlock { x, y, subtype } => prefab::slope(ids, IVec2::new(*x, *y), *subtype)?,
            EntitySpec::MovingBlock {
                w,
                h,
                duration,
                looping,
                points,
                ..
            } => {
                let points = points.iter().map(|[px, py]| subpixel_of(IVec2::new(*px, *py))).collect();
                let path = MovingPath::new(points, *duration, *looping)?;
                prefab::moving_block(ids, IVec2::new(*w, *h), path)?
            }
            EntitySpec::Spikes { x, y, w, h, direction } => {
                prefab::spikes(ids, Rect::new(*x, *y, *w, *h), spike_direction(direction)?)?
            }
            EntitySpec::StartBlock {
                x,
                y,
                w,
                h,
                player_id,
                x_dir,
            } => prefab::start_block(ids, Rect::new(*x, *y, *w, *h), *player_id, *x_dir)?,
            EntitySpec::EndBlock { x, y, w, h, player_id } => {
                prefab::end_block(ids, Rect::new(*x, *y, *w, *h), *player_id)?
            }
            EntitySpec::DoorBlock {
                x,
                y,
                w,
                h,
                toggle_idx,
                inverted,
            } => prefab::door(ids, Rect::new(*x, *y, *w, *h), *toggle_idx, *inverted)?,
            EntitySpec::Key { x, y, toggle_idx } => prefab::key(ids, IVec2::new(*x, *y), *toggle_idx)?,
            EntitySpec::Player { x, y, player_id } => {
                return self.spawn_player(IVec2::new(*x, *y), *player_id, 1, Driver::Live);
            }
        };
        Ok(self.spawn(prefab))
    }

    /// Queue `id` for removal in the next apply phase.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if self.entities.contains_key(&id) || self.pending_add.iter().any(|p| p.prefab.entity.id == id) {
            self.pending_remove.insert(id)
        } else {
            false
        }
    }

    /// Break a solid block: it is removed next tick and `BlockBroken` is
    /// reported now.
    pub fn break_block(&mut self, id: EntityId) -> bool {
        let breakable = self
            .entities
            .get(&id)
            .is_some_and(|e| !e.is_dynamic() && e.has_solid());
        if !breakable || !self.pending_remove.insert(id) {
            return false;
        }
        tracing::debug!(block = %id, "block broken");
        self.events.push(WorldEvent::BlockBroken { block: id });
        true
    }

    /// Advance one tick.
    ///
    /// `action` drives every live player and is appended to the live
    /// recording.
    pub fn step(&mut self, action: &ActionSet) {
        let span = tracing::debug_span!("tick", tick = self.tick);
        let _enter = span.enter();

        self.apply_pending();
        let prior: BTreeMap<EntityId, Velocity> = self
            .entities
            .values()
            .filter(|e| e.is_dynamic())
            .map(|e| (e.id, e.vel))
            .collect();
        self.update_entities(*action);
        for (group, ids) in self.physics_groups() {
            tracing::trace!(group = group.0, count = ids.len(), "solving group");
            for id in ids {
                self.solve(id, prior.get(&id).copied());
            }
        }
        let dynamic = self.dynamic_ids();
        self.sensors = SensorState::compute(&self.entities, &self.grid, &dynamic);
        self.interact();
        self.update_frames();
        self.tick += 1;
    }

    /// P1: adds first, then removals.
    fn apply_pending(&mut self) {
        for PendingSpawn { prefab, driver } in std::mem::take(&mut self.pending_add) {
            self.insert(prefab, driver);
        }
        for id in std::mem::take(&mut self.pending_remove) {
            self.remove(id);
        }
    }

    fn insert(&mut self, prefab: Prefab, driver: Driver) {
        let Prefab {
            entity,
            components,
            path,
            player,
        } = prefab;
        let id = entity.id;
        if !entity.is_dynamic() && entity.has_solid() {
            self.grid.insert(id, entity.collider_bounds());
        }
        for component in components {
            match component {
                Component::Start(c) => self.components.set_start(id, c),
                Component::End(c) => self.components.set_end(id, c),
                Component::Door(c) => self.components.set_door(id, c),
                Component::Key(c) => self.components.set_key(id, c),
                Component::Spikes(c) => self.components.set_spikes(id, c),
                Component::Lifetime(c) => self.components.set_lifetime(id, c),
                Component::Player(c) => self.components.set_player_tag(id, c),
            }
        }
        if let Some(path) = path {
            self.movers.insert(id, path);
        }
        if let Some(parts) = player {
            if matches!(driver, Driver::Live) && self.recorder.is_none() {
                self.recorder = Some(RecordingController::new(self.tick));
            }
            let controller =
                PlayerController::new(parts.player_id, parts.sensors, self.physics, driver).facing_dir(parts.x_dir);
            self.players.insert(id, controller);
        }
        tracing::debug!(entity = %id, kind = ?entity.kind, "spawned");
        self.events.push(WorldEvent::Spawned { id, kind: entity.kind });
        self.entities.insert(id, entity);
    }

    fn remove(&mut self, id: EntityId) {
        if self.entities.remove(&id).is_none() {
            return;
        }
        self.grid.remove(id);
        self.players.remove(&id);
        self.movers.remove(&id);
        self.components.remove_entity(id);
        for orphan in self.frames.remove(id) {
            if let Some(child) = self.entities.get_mut(&orphan) {
                child.parent = None;
            }
            tracing::debug!(child = %orphan, parent = %id, "parent removed");
        }
        tracing::debug!(entity = %id, "despawned");
        self.events.push(WorldEvent::Despawned { id });
    }

    /// P2: lifetimes, moving blocks and player controllers, in id order.
    fn update_entities(&mut self, host: ActionSet) {
        for expired in self.components.tick_lifetimes() {
            self.pending_remove.insert(expired);
        }
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.record(host);
        }

        let tick = self.tick;
        let ids: Vec<EntityId> = self.entities.keys().copied().collect();
        for id in ids {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            if let Some(path) = self.movers.get_mut(&id) {
                entity.pos = path.advance();
                entity.vel = path.velocity();
                self.grid.update(id, entity.collider_bounds());
            }
            if let Some(player) = self.players.get_mut(&id) {
                let action = match &mut player.driver {
                    Driver::Live => host,
                    Driver::Playback(playback) => {
                        let was_finished = playback.is_finished();
                        match playback.next(tick) {
                            Playback::Action(action) => action,
                            Playback::Finished => {
                                if !was_finished {
                                    self.events.push(WorldEvent::PlaybackFinished { actor: id });
                                }
                                ActionSet::IDLE
                            }
                        }
                    }
                    Driver::Idle => ActionSet::IDLE,
                };
                let contacts = Contacts::read(&self.sensors, &player.sensors);
                let out = player.update(action, contacts, entity.vel);
                entity.vel = out.vel;
                if let Some(snap) = entity.collider_mut(player.sensors.snap_down) {
                    snap.enabled = out.snap_down;
                }
            }
        }
    }

    /// P3: dynamic entities bucketed by physics group, ascending.
    fn physics_groups(&self) -> BTreeMap<PhysicsGroup, Vec<EntityId>> {
        let mut groups: BTreeMap<PhysicsGroup, Vec<EntityId>> = BTreeMap::new();
        for (id, e) in &self.entities {
            if let Some(group) = e.group {
                groups.entry(group).or_default().push(*id);
            }
        }
        groups
    }

    fn dynamic_ids(&self) -> BTreeSet<EntityId> {
        self.entities
            .values()
            .filter(|e| e.is_dynamic())
            .map(|e| e.id)
            .collect()
    }

    /// Solid colliders near the swept box of `actor`, ordered by entity then
    /// collider id.
    fn obstacles_for(&self, actor: &Entity) -> Vec<Obstacle> {
        let bounds = actor.collider_bounds();
        let shift = pixel_of(actor.pos + actor.vel.step()) - actor.pixel_pos();
        let region = bounds.union(&bounds.translate(shift)).grow(self.config.search_margin_px);
        self.grid
            .query(&region)
            .into_iter()
            .filter(|id| *id != actor.id)
            .filter_map(|id| self.entities.get(&id))
            .filter(|e| !e.is_dynamic())
            .flat_map(Obstacle::from_entity)
            .collect()
    }

    /// P4 for one actor: carry by the parent block, then resolve. When the
    /// search fails the actor keeps its position and its pre-tick velocity.
    fn solve(&mut self, id: EntityId, prior_vel: Option<Velocity>) {
        let Some(current) = self.entities.get(&id) else {
            return;
        };
        let mut actor = current.clone();
        if let Some(parent) = self.frames.parent(id)
            && let Some(path) = self.movers.get(&parent)
        {
            actor.pos += path.delta();
        }
        let obstacles = self.obstacles_for(&actor);
        let settings = ResolverSettings {
            node_limit: self.config.node_limit,
            max_step_px: self.config.max_step_px,
        };
        match resolve(&actor, &obstacles, settings) {
            Ok(done) => {
                if let Some(e) = self.entities.get_mut(&id) {
                    e.pos = done.pos;
                    e.vel = done.vel;
                }
            }
            Err(ResolveError::NoValidPositionFound { entity, expansions }) => {
                tracing::warn!(%entity, expansions, tick = self.tick, "no valid position; keeping previous state");
                if let (Some(e), Some(vel)) = (self.entities.get_mut(&id), prior_vel) {
                    e.vel = vel;
                }
                self.events.push(WorldEvent::ResolveFailed {
                    actor: entity,
                    expansions,
                });
            }
        }
    }

    /// P6: pick each player's frame-of-reference parent for the next tick.
    fn update_frames(&mut self) {
        let choices: Vec<(EntityId, Option<EntityId>)> = self
            .players
            .iter()
            .filter_map(|(id, player)| {
                let actor = self.entities.get(id)?;
                Some((*id, choose_parent(actor, &player.sensors.feet(), &self.sensors, &self.entities)))
            })
            .collect();
        for (id, parent) in choices {
            if self.frames.set_parent(id, parent) {
                tracing::trace!(actor = %id, parent = ?parent, "frame of reference changed");
            }
            if let Some(e) = self.entities.get_mut(&id) {
                e.parent = parent;
            }
        }
    }

    /// Bodies at this tick boundary, in id order.
    pub fn snapshot(&self) -> Vec<BodySnapshot> {
        self.entities
            .values()
            .map(|e| BodySnapshot {
                id: e.id,
                kind: e.kind,
                pixel: e.pixel_pos(),
                pos: e.pos,
                vel: e.vel,
                size: e.size,
                parent: e.parent,
            })
            .collect()
    }

    /// FNV-1a over tick, ids, positions and velocities.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= u64::from(b);
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (id, e) in &self.entities {
            mix(&mut h, &id.0.to_le_bytes());
            mix(&mut h, &e.pos.x.to_le_bytes());
            mix(&mut h, &e.pos.y.to_le_bytes());
            mix(&mut h, &e.vel.x.raw().to_le_bytes());
            mix(&mut h, &e.vel.y.raw().to_le_bytes());
        }
        h
    }
}
