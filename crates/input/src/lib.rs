//! Input: per-tick action sets and their recording and playback.
//!
//! # Invariants
//! - Controllers consume [`ActionSet`]s, never raw device state.
//! - A recording replays the exact action sets it captured, tick for tick.

pub mod action;
pub mod recording;

pub use action::{ActionSet, ButtonEdge, EdgeTracker, RawButtons};
pub use recording::{Playback, PlaybackController, PlaybackError, Recording, RecordingController};
