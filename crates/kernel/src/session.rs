//! Level sessions: one character at a time, with every solved character
//! replaying its recorded run alongside the next one.

use echostep_common::{EntityId, IVec2};
use echostep_input::{ActionSet, Recording};

use crate::blueprint::{EntitySpec, LevelSpec};
use crate::config::WorldConfig;
use crate::events::WorldEvent;
use crate::player::Driver;
use crate::prefab::spawn_point;
use crate::world::{World, WorldError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("level `{0}` has no start block")]
    NoCharacters(String),
    #[error(transparent)]
    World(#[from] WorldError),
}

/// A playable character: where it spawns and which end block it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Character {
    pub player_id: u32,
    pub spawn: IVec2,
    pub x_dir: i32,
}

/// What a session step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Running,
    /// The live character reached its end; the world restarted with it
    /// replaying.
    CharacterSolved { player_id: u32 },
    /// The live character died; the attempt restarted.
    Restarted { player_id: u32 },
    Complete,
}

#[derive(Debug)]
pub struct Session {
    config: WorldConfig,
    level: LevelSpec,
    characters: Vec<Character>,
    solved: Vec<Recording>,
    world: World,
    live: Option<EntityId>,
    attempts: u32,
    events: Vec<WorldEvent>,
}

impl Session {
    pub fn new(config: WorldConfig, level: LevelSpec) -> Result<Self, SessionError> {
        let mut characters: Vec<Character> = Vec::new();
        for spec in &level.entities {
            if let EntitySpec::StartBlock { player_id, x_dir, .. } = spec
                && let Some(rect) = spec.rect()
            {
                if characters.iter().any(|c| c.player_id == *player_id) {
                    tracing::warn!(player_id, "duplicate start block ignored");
                    continue;
                }
                characters.push(Character {
                    player_id: *player_id,
                    spawn: spawn_point(rect),
                    x_dir: *x_dir,
                });
            }
        }
        if characters.is_empty() {
            return Err(SessionError::NoCharacters(level.level_id));
        }
        characters.sort_by_key(|c| c.player_id);

        let world = World::new(config.clone())?;
        let mut session = Self {
            config,
            level,
            characters,
            solved: Vec::new(),
            world,
            live: None,
            attempts: 0,
            events: Vec::new(),
        };
        session.rebuild()?;
        Ok(session)
    }

    /// Fresh world: level geometry, one replay per solved character and the
    /// current character live.
    fn rebuild(&mut self) -> Result<(), SessionError> {
        let specs = self.level.entities.iter().filter(|s| !s.is_player());
        let mut world = World::from_specs(self.config.clone(), specs)?;
        for (character, recording) in self.characters.iter().zip(&self.solved) {
            world
                .spawn_playback(character.spawn, character.player_id, character.x_dir, recording.clone())
                .map_err(WorldError::from)?;
        }
        self.live = match self.characters.get(self.solved.len()) {
            Some(c) => Some(
                world
                    .spawn_player(c.spawn, c.player_id, c.x_dir, Driver::Live)
                    .map_err(WorldError::from)?,
            ),
            None => None,
        };
        self.attempts += 1;
        tracing::debug!(
            level = %self.level.level_id,
            solved = self.solved.len(),
            attempt = self.attempts,
            "session world built"
        );
        self.world = world;
        Ok(())
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    /// Recordings of the characters solved so far, in character order.
    pub fn recordings(&self) -> &[Recording] {
        &self.solved
    }

    pub fn current(&self) -> Option<&Character> {
        self.characters.get(self.solved.len())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_complete(&self) -> bool {
        self.solved.len() == self.characters.len()
    }

    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    /// Step the live world once with the host's input.
    pub fn step(&mut self, action: &ActionSet) -> Result<SessionStatus, SessionError> {
        let Some(current) = self.current().copied() else {
            return Ok(SessionStatus::Complete);
        };
        self.world.step(action);

        let mut solved = false;
        let mut died = false;
        for event in self.world.drain_events() {
            match event {
                WorldEvent::ActorSatisfiedEnd { actor, player_id, .. }
                    if Some(actor) == self.live && player_id == current.player_id =>
                {
                    solved = true;
                }
                WorldEvent::ActorKilled { actor, .. } if Some(actor) == self.live => died = true,
                _ => {}
            }
            self.events.push(event);
        }

        if solved {
            let recording = self.world.take_recording().unwrap_or_default();
            tracing::info!(player_id = current.player_id, ticks = recording.len(), "character solved");
            self.solved.push(recording);
            if self.is_complete() {
                return Ok(SessionStatus::Complete);
            }
            self.rebuild()?;
            return Ok(SessionStatus::CharacterSolved {
                player_id: current.player_id,
            });
        }
        if died {
            tracing::info!(player_id = current.player_id, "character died; restarting");
            self.rebuild()?;
            return Ok(SessionStatus::Restarted {
                player_id: current.player_id,
            });
        }
        Ok(SessionStatus::Running)
    }
}
