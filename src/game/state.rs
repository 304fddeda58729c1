use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::MarkerCatalog;
use crate::utils::time_fmt::{format_countdown, is_low_time};

pub const INITIAL_CLUE: &str = "Find the first marker to begin";
pub const ALL_FOUND_CLUE: &str = "Great job! You've found everything!";
pub const NO_MORE_HINTS: &str = "No more hints for this item!";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionOutcome {
    Won,
    Lost,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FoundItem {
    pub marker_id: String,
    pub points: u32,
}

/// What happened to a single recognition event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// The marker was the next one in order. `next_target` is `None` once
    /// every marker has been found.
    Accepted {
        marker_id: String,
        points: u32,
        next_target: Option<String>,
    },
    AlreadyFound,
    /// Out of order or unknown. `required` names the marker the player still
    /// has to find, if any.
    Rejected { required: Option<String> },
    Inactive,
}

impl RecognitionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, RecognitionOutcome::Accepted { .. })
    }

    pub fn completes_hunt(&self) -> bool {
        matches!(
            self,
            RecognitionOutcome::Accepted {
                next_target: None,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintResponse {
    Hint(String),
    Exhausted,
    Inactive,
}

impl HintResponse {
    /// Text to show the player, `None` when the request was ignored.
    pub fn text(&self) -> Option<&str> {
        match self {
            HintResponse::Hint(hint) => Some(hint.as_str()),
            HintResponse::Exhausted => Some(NO_MORE_HINTS),
            HintResponse::Inactive => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Counting { remaining_secs: u32 },
    /// Everything is found and the win is pending; the clock did not move.
    Frozen,
    Expired,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EndSummary {
    pub outcome: SessionOutcome,
    pub title: String,
    pub message: String,
}

impl EndSummary {
    fn new(outcome: SessionOutcome, username: &str, score: u32) -> Self {
        let title = match outcome {
            SessionOutcome::Won => "Congratulations!",
            SessionOutcome::Lost => "Time's Up!",
        };
        Self {
            outcome,
            title: title.into(),
            message: format!("{username}, your final score: {score}"),
        }
    }
}

/// Read-only view of everything the presentation layer displays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub session_id: Option<String>,
    pub username: String,
    pub phase: SessionPhase,
    pub score: u32,
    pub time_remaining_secs: u32,
    pub time_display: String,
    pub low_time: bool,
    pub current_target: Option<String>,
    pub current_clue: String,
    pub hint_index: usize,
    pub found_animation: Option<FoundItem>,
    pub last_found: Option<FoundItem>,
    pub found_count: usize,
    pub total_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub end_summary: Option<EndSummary>,
}

/// The hunt's progression state machine: `Idle` → `Active` → `Ended`.
///
/// Pure in-memory transitions; callers serialize access.
#[derive(Debug, Clone)]
pub struct GameState {
    catalog: Arc<MarkerCatalog>,
    session_secs: u32,
    /// Bumped on every start so work scheduled for an earlier session can
    /// recognize it is stale.
    generation: u64,
    session_id: Option<String>,
    username: String,
    phase: SessionPhase,
    outcome: Option<SessionOutcome>,
    score: u32,
    time_remaining: u32,
    found: HashSet<String>,
    current_target: Option<String>,
    hint_index: usize,
    current_clue: String,
    found_animation: Option<FoundItem>,
    animation_seq: u64,
    last_found: Option<FoundItem>,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    end_summary: Option<EndSummary>,
}

impl GameState {
    pub fn new(catalog: Arc<MarkerCatalog>, session_secs: u32) -> Self {
        Self {
            catalog,
            session_secs,
            generation: 0,
            session_id: None,
            username: String::new(),
            phase: SessionPhase::Idle,
            outcome: None,
            score: 0,
            time_remaining: session_secs,
            found: HashSet::new(),
            current_target: None,
            hint_index: 0,
            current_clue: INITIAL_CLUE.into(),
            found_animation: None,
            animation_seq: 0,
            last_found: None,
            started_at: None,
            ended_at: None,
            end_summary: None,
        }
    }

    pub fn set_username(&mut self, name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            bail!("Please enter your name to start the game.");
        }
        self.username = trimmed.to_string();
        Ok(())
    }

    /// Reset progress and begin a fresh session. Valid from any phase.
    /// Returns the new session generation.
    pub fn start(&mut self, session_id: String, started_at: DateTime<Utc>) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.session_id = Some(session_id);
        self.phase = SessionPhase::Active;
        self.outcome = None;
        self.score = 0;
        self.time_remaining = self.session_secs;
        self.found.clear();
        self.hint_index = 0;
        self.found_animation = None;
        self.last_found = None;
        self.started_at = Some(started_at);
        self.ended_at = None;
        self.end_summary = None;
        self.retarget();
        self.generation
    }

    /// Whether `marker_id` would be accepted right now.
    pub fn can_accept(&self, marker_id: &str) -> bool {
        self.phase == SessionPhase::Active
            && !self.found.contains(marker_id)
            && self.catalog.id_at(self.found.len()) == Some(marker_id)
    }

    pub fn on_marker_recognized(&mut self, marker_id: &str) -> RecognitionOutcome {
        if self.phase != SessionPhase::Active {
            return RecognitionOutcome::Inactive;
        }
        if self.found.contains(marker_id) {
            return RecognitionOutcome::AlreadyFound;
        }
        if !self.can_accept(marker_id) {
            let required = self.current_target.clone();
            if let Some(required) = &required {
                self.current_clue = format!("You must find {required} first!");
            }
            return RecognitionOutcome::Rejected { required };
        }

        let points = self.catalog.points_for(marker_id);
        self.found.insert(marker_id.to_string());
        self.score = self.score.saturating_add(points);

        let item = FoundItem {
            marker_id: marker_id.to_string(),
            points,
        };
        self.animation_seq = self.animation_seq.wrapping_add(1);
        self.found_animation = Some(item.clone());
        self.last_found = Some(item);

        self.hint_index = 0;
        self.retarget();

        RecognitionOutcome::Accepted {
            marker_id: marker_id.to_string(),
            points,
            next_target: self.current_target.clone(),
        }
    }

    pub fn request_hint(&mut self) -> HintResponse {
        if self.phase != SessionPhase::Active {
            return HintResponse::Inactive;
        }

        let hint = self.current_target.as_deref().and_then(|target| {
            self.catalog.hints_for(target).get(self.hint_index).cloned()
        });

        match hint {
            Some(hint) => {
                self.hint_index += 1;
                self.current_clue = hint.clone();
                HintResponse::Hint(hint)
            }
            None => {
                self.current_clue = NO_MORE_HINTS.into();
                HintResponse::Exhausted
            }
        }
    }

    /// One countdown step. The clock stops once the hunt is complete and the
    /// win is pending.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.phase != SessionPhase::Active {
            return TickOutcome::Inactive;
        }
        if self.is_complete() {
            return TickOutcome::Frozen;
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        if self.time_remaining == 0 {
            self.end(SessionOutcome::Lost, now);
            return TickOutcome::Expired;
        }
        TickOutcome::Counting {
            remaining_secs: self.time_remaining,
        }
    }

    /// Freeze the session. Returns false when it was not active.
    pub fn end(&mut self, outcome: SessionOutcome, now: DateTime<Utc>) -> bool {
        if self.phase != SessionPhase::Active {
            return false;
        }
        self.phase = SessionPhase::Ended;
        self.outcome = Some(outcome);
        self.ended_at = Some(now);
        self.end_summary = Some(EndSummary::new(outcome, &self.username, self.score));
        true
    }

    /// Leave the game screen. Progress stays readable until the next start.
    pub fn exit(&mut self) {
        self.phase = SessionPhase::Idle;
        self.found_animation = None;
    }

    /// Hide the found animation if it is still the one identified by `seq`.
    pub fn hide_found_animation(&mut self, seq: u64) -> bool {
        if seq != self.animation_seq || self.found_animation.is_none() {
            return false;
        }
        self.found_animation = None;
        true
    }

    fn retarget(&mut self) {
        self.current_target = self
            .catalog
            .id_at(self.found.len())
            .map(|id| id.to_string());
        self.current_clue = match &self.current_target {
            Some(target) => format!("Find item: {target}"),
            None => ALL_FOUND_CLUE.into(),
        };
    }

    pub fn is_complete(&self) -> bool {
        self.found.len() >= self.catalog.len()
    }

    pub fn is_active(&self) -> bool {
        self.phase == SessionPhase::Active
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn animation_seq(&self) -> u64 {
        self.animation_seq
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn current_target(&self) -> Option<&str> {
        self.current_target.as_deref()
    }

    pub fn current_clue(&self) -> &str {
        &self.current_clue
    }

    pub fn hint_index(&self) -> usize {
        self.hint_index
    }

    pub fn found_count(&self) -> usize {
        self.found.len()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            session_id: self.session_id.clone(),
            username: self.username.clone(),
            phase: self.phase,
            score: self.score,
            time_remaining_secs: self.time_remaining,
            time_display: format_countdown(self.time_remaining),
            low_time: is_low_time(self.time_remaining),
            current_target: self.current_target.clone(),
            current_clue: self.current_clue.clone(),
            hint_index: self.hint_index,
            found_animation: self.found_animation.clone(),
            last_found: self.last_found.clone(),
            found_count: self.found.len(),
            total_count: self.catalog.len(),
            started_at: self.started_at,
            ended_at: self.ended_at,
            end_summary: self.end_summary.clone(),
        }
    }
}
