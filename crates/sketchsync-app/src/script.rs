//! Gesture scripts: recorded pointer input replayed by the CLI.
//!
//! A script is a JSON array of steps in client coordinates:
//! ```json
//! [{"kind": "down", "x": 10, "y": 10}, {"kind": "move", "x": 20, "y": 15}, {"kind": "up", "x": 20, "y": 15}]
//! ```

use kurbo::Point;
use serde::{Deserialize, Serialize};
use sketchsync_core::PointerEvent;
use std::path::Path;
use thiserror::Error;

/// Script loading errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Down,
    Move,
    Up,
}

/// One scripted pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureStep {
    pub kind: StepKind,
    pub x: f64,
    pub y: f64,
}

impl From<GestureStep> for PointerEvent {
    fn from(step: GestureStep) -> Self {
        let position = Point::new(step.x, step.y);
        match step.kind {
            StepKind::Down => PointerEvent::Down { position },
            StepKind::Move => PointerEvent::Move { position },
            StepKind::Up => PointerEvent::Up { position },
        }
    }
}

/// Parse a script from JSON text.
pub fn parse_script(text: &str) -> Result<Vec<PointerEvent>, ScriptError> {
    let steps: Vec<GestureStep> = serde_json::from_str(text)?;
    Ok(steps.into_iter().map(PointerEvent::from).collect())
}

/// Load a script file.
pub fn load_script(path: impl AsRef<Path>) -> Result<Vec<PointerEvent>, ScriptError> {
    let text = std::fs::read_to_string(path)?;
    parse_script(&text)
}
