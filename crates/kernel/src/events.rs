use echostep_common::EntityId;
use echostep_ecs::EntityKind;
use serde::{Deserialize, Serialize};

/// Notable things that happened during a tick.
///
/// Pushed in the order they occur; the host drains them after `step` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Entity entered the world during apply-pending.
    Spawned { id: EntityId, kind: Option<EntityKind> },
    /// Entity left the world during apply-pending.
    Despawned { id: EntityId },
    /// A character reached the end block carrying its player id.
    ActorSatisfiedEnd { actor: EntityId, end: EntityId, player_id: u32 },
    BlockBroken { block: EntityId },
    KeyCollected { key: EntityId, actor: EntityId },
    DoorToggled { door: EntityId, open: bool },
    ActorKilled { actor: EntityId, by: EntityId },
    /// The nearest-valid-position search ran out of budget; the actor kept
    /// its pre-tick state.
    ResolveFailed { actor: EntityId, expansions: usize },
    /// A playback character ran past the end of its recording.
    PlaybackFinished { actor: EntityId },
}
