use crate::action::ActionSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("tick {tick} is outside recording [{start}, {start} + {len})")]
    InputOutOfRange { tick: u64, start: u64, len: usize },
}

/// A frozen input trace: `actions[i]` was consumed on tick `start_tick + i`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub start_tick: u64,
    pub actions: Vec<ActionSet>,
}

impl Recording {
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// First tick with no recorded input.
    pub fn end_tick(&self) -> u64 {
        self.start_tick + self.actions.len() as u64
    }
}

/// Captures the live actor's inputs tick by tick.
#[derive(Debug, Clone, Default)]
pub struct RecordingController {
    recording: Recording,
}

impl RecordingController {
    pub fn new(start_tick: u64) -> Self {
        Self {
            recording: Recording {
                start_tick,
                actions: Vec::new(),
            },
        }
    }

    pub fn record(&mut self, action: ActionSet) {
        self.recording.actions.push(action);
    }

    pub fn start_tick(&self) -> u64 {
        self.recording.start_tick
    }

    pub fn len(&self) -> usize {
        self.recording.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recording.is_empty()
    }

    /// Copy of everything captured so far.
    pub fn snapshot(&self) -> Recording {
        self.recording.clone()
    }

    pub fn finish(self) -> Recording {
        tracing::debug!(
            start = self.recording.start_tick,
            ticks = self.recording.len(),
            "recording finished"
        );
        self.recording
    }
}

/// Result of asking a playback for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Action(ActionSet),
    Finished,
}

/// Replays a [`Recording`].
#[derive(Debug, Clone)]
pub struct PlaybackController {
    recording: Recording,
    finished: bool,
}

impl PlaybackController {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            finished: false,
        }
    }

    pub fn recording(&self) -> &Recording {
        &self.recording
    }

    /// Input for `tick`, or `InputOutOfRange` outside the recorded window.
    pub fn action_at(&self, tick: u64) -> Result<ActionSet, PlaybackError> {
        let out_of_range = || PlaybackError::InputOutOfRange {
            tick,
            start: self.recording.start_tick,
            len: self.recording.len(),
        };
        let offset = tick
            .checked_sub(self.recording.start_tick)
            .ok_or_else(out_of_range)?;
        usize::try_from(offset)
            .ok()
            .and_then(|i| self.recording.actions.get(i))
            .copied()
            .ok_or_else(out_of_range)
    }

    /// Input for `tick`, folding out-of-range into [`Playback::Finished`].
    pub fn next(&mut self, tick: u64) -> Playback {
        match self.action_at(tick) {
            Ok(action) => Playback::Action(action),
            Err(err) => {
                if !self.finished {
                    self.finished = true;
                    tracing::debug!(%err, "playback finished");
                }
                Playback::Finished
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
