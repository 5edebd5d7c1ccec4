//! Deterministic world tick for a 2D platformer.
//!
//! A [`World`] owns every entity and advances in fixed ticks: apply pending
//! spawns and removals, update entities and players, resolve dynamic actors
//! against solid geometry, recompute sensors, run gameplay interactions and
//! pick frame-of-reference parents.
//!
//! # Invariants
//! - Same level, same config and same input sequence give bit-identical
//!   positions and velocities on every tick.
//! - A resolver call either commits a valid position or leaves the actor
//!   untouched; the tick itself never fails.
//! - Sensor results are sorted id lists.
//! - No floating point runs inside a tick; tuning is compiled to fixed point
//!   before the first tick.

pub mod blueprint;
pub mod config;
pub mod events;
pub mod frames;
pub mod moving_block;
pub mod player;
pub mod prefab;
pub mod resolver;
pub mod sensors;
pub mod session;
pub mod tuning;
pub mod world;

pub use blueprint::{
    EntitySpec, LevelLoad, LevelSpec, RejectedEntity, SlopeSubtype, SpecError, load_level, parse_entity,
    spike_direction,
};
pub use config::WorldConfig;
pub use events::WorldEvent;
pub use frames::{FrameGraph, choose_parent};
pub use moving_block::{MovingPath, PathError};
pub use player::{Contacts, ControlOutput, Driver, PlayerController, PlayerSensors};
pub use resolver::{Obstacle, Resolution, ResolveError, ResolverSettings, resolve};
pub use sensors::SensorState;
pub use session::{Character, Session, SessionError, SessionStatus};
pub use tuning::{PlayerPhysics, PlayerTuning, TuningError};
pub use world::{BodySnapshot, World, WorldError};
