//! Input scripts: JSON lists of raw button samples, each held for `repeat`
//! ticks. Ticks past the end of the script are idle.

use echostep_input::RawButtons;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    #[serde(flatten)]
    pub buttons: RawButtons,
    #[serde(default = "one")]
    pub repeat: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputScript {
    samples: Vec<RawButtons>,
}

impl InputScript {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let steps: Vec<ScriptStep> = serde_json::from_str(text)?;
        Ok(Self::from_steps(&steps))
    }

    pub fn from_steps(steps: &[ScriptStep]) -> Self {
        let samples = steps
            .iter()
            .flat_map(|s| std::iter::repeat_n(s.buttons, s.repeat as usize))
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn sample(&self, index: usize) -> RawButtons {
        self.samples.get(index).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeats_expand_in_order() {
        let script = InputScript::parse(
            r#"[{"right": true, "repeat": 3}, {"right": true, "jump": true}, {"left": true, "repeat": 2}]"#,
        )
        .unwrap();
        assert_eq!(script.len(), 6);
        assert!(script.sample(2).right && !script.sample(2).jump);
        assert!(script.sample(3).jump);
        assert!(script.sample(5).left);
        assert_eq!(script.sample(6), RawButtons::default());
    }

    #[test]
    fn empty_script_is_idle() {
        let script = InputScript::parse("[]").unwrap();
        assert_eq!(script.len(), 0);
        assert_eq!(script.sample(0), RawButtons::default());
    }
}
