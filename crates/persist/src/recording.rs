use echostep_input::{ActionSet, Recording};
use serde::{Deserialize, Serialize};

/// On-disk form of one character's recorded run.
///
/// Field order is part of the format: `level_id`, `player_type`, `start_tick`,
/// `ticks`. `ticks[i]` is the action consumed on tick `start_tick + i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingFile {
    pub level_id: String,
    /// `player_id` of the character that produced the run.
    pub player_type: u32,
    pub start_tick: u64,
    pub ticks: Vec<ActionSet>,
}

impl RecordingFile {
    pub fn new(level_id: impl Into<String>, player_type: u32, recording: Recording) -> Self {
        Self {
            level_id: level_id.into(),
            player_type,
            start_tick: recording.start_tick,
            ticks: recording.actions,
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn to_recording(&self) -> Recording {
        Recording {
            start_tick: self.start_tick,
            actions: self.ticks.clone(),
        }
    }

    pub fn into_recording(self) -> Recording {
        Recording {
            start_tick: self.start_tick,
            actions: self.ticks,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use echostep_input::{EdgeTracker, RawButtons};

    fn sample() -> RecordingFile {
        let mut edges = EdgeTracker::new();
        let actions = [
            RawButtons { right: true, ..Default::default() },
            RawButtons { right: true, jump: true, ..Default::default() },
            RawButtons { jump: true, ..Default::default() },
            RawButtons::default(),
        ]
        .into_iter()
        .map(|raw| edges.sample(raw))
        .collect();
        RecordingFile::new(
            "1-1",
            0,
            Recording {
                start_tick: 12,
                actions,
            },
        )
    }

    #[test]
    fn json_keeps_field_order() {
        let json = sample().to_json().unwrap();
        let keys = ["\"level_id\"", "\"player_type\"", "\"start_tick\"", "\"ticks\""];
        let at: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(at.windows(2).all(|w| w[0] < w[1]), "{json}");
        assert_eq!(RecordingFile::from_json(&json).unwrap(), sample());
    }

    #[test]
    fn converts_to_a_playable_recording() {
        let file = sample();
        let rec = file.to_recording();
        assert_eq!(rec.start_tick, 12);
        assert_eq!(rec.end_tick(), 16);
        assert!(rec.actions[1].jump_pressed());
        assert!(rec.actions[2].jump_held() && !rec.actions[2].jump_pressed());
        assert_eq!(file.into_recording(), rec);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = RecordingFile::from_json(r#"{"level_id":"x","start_tick":0,"ticks":[]}"#).unwrap_err();
        assert!(err.to_string().contains("player_type"));
    }
}
