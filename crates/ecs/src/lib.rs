//! Entity, collider and component model.
//!
//! Entities own their colliders; gameplay data lives beside them in a
//! [`ComponentStore`].
//!
//! # Invariants
//! - Rectangle colliders have positive extent; triangle colliders have three
//!   distinct vertices. Construction fails otherwise, never the tick.
//! - Collider ids are stable for the lifetime of their entity.
//! - Iteration order is deterministic (BTreeMap).

pub mod collider;
pub mod components;
pub mod entity;

pub use collider::{Collider, ColliderError, ColliderMask, MaskSet, ResolutionHint};
pub use components::{
    ComponentEvent, ComponentKind, ComponentStore, DoorState, EndZone, KeyState, Lifetime,
    PlayerTag, SpikeDirection, Spikes, StartMarker,
};
pub use entity::{Entity, EntityKind};
