use serde::Serialize;

use super::state::{EndSummary, FoundItem, GameSnapshot};

/// Change notifications published by the controller.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum GameEvent {
    StateChanged(GameSnapshot),
    MarkerFound(FoundItem),
    MarkerRejected {
        marker_id: String,
        required: Option<String>,
    },
    HintRevealed(String),
    SessionEnded(EndSummary),
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::StateChanged(_) => "state-changed",
            GameEvent::MarkerFound(_) => "marker-found",
            GameEvent::MarkerRejected { .. } => "marker-rejected",
            GameEvent::HintRevealed(_) => "hint-revealed",
            GameEvent::SessionEnded(_) => "session-ended",
        }
    }
}
