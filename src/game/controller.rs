use std::{future::Future, sync::Arc, time::Duration};

use anyhow::Result;
use chrono::Utc;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time,
};
use uuid::Uuid;

use crate::{
    catalog::MarkerCatalog,
    recognition::TrackingEvent,
    settings::GameSettings,
};

use super::{
    events::GameEvent,
    overlay::{OverlayDirective, OverlayTracker},
    state::{
        FoundItem, GameSnapshot, GameState, HintResponse, RecognitionOutcome, SessionOutcome,
        TickOutcome,
    },
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const EVENT_CAPACITY: usize = 64;

/// Owns the game session and serializes every mutation of it.
///
/// Cloning is cheap; all clones drive the same session. The countdown and the
/// delayed one-shots (found-animation hide, victory) run as tokio tasks owned
/// here and are aborted whenever the session is restarted, ended or exited.
#[derive(Clone)]
pub struct GameController {
    state: Arc<Mutex<GameState>>,
    catalog: Arc<MarkerCatalog>,
    overlays: Arc<Mutex<OverlayTracker>>,
    events: broadcast::Sender<GameEvent>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    pending: Arc<Mutex<Vec<JoinHandle<()>>>>,
    tick_interval: Duration,
    victory_delay: Duration,
    found_animation: Duration,
}

impl GameController {
    pub fn new(catalog: Arc<MarkerCatalog>, settings: &GameSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            state: Arc::new(Mutex::new(GameState::new(
                catalog.clone(),
                settings.session_secs,
            ))),
            catalog,
            overlays: Arc::new(Mutex::new(OverlayTracker::new())),
            events,
            ticker: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(Vec::new())),
            tick_interval: settings.tick_interval(),
            victory_delay: settings.victory_delay(),
            found_animation: settings.found_animation(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> GameSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn set_username(&self, name: &str) -> Result<()> {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.set_username(name)?;
            state.snapshot()
        };
        self.emit(GameEvent::StateChanged(snapshot));
        Ok(())
    }

    /// Start or restart the hunt.
    pub async fn start(&self) -> GameSnapshot {
        self.cancel_ticker().await;
        self.cancel_pending().await;
        self.overlays.lock().await.clear();

        let session_id = Uuid::new_v4().to_string();
        let (generation, snapshot) = {
            let mut state = self.state.lock().await;
            let generation = state.start(session_id.clone(), Utc::now());
            (generation, state.snapshot())
        };

        self.spawn_ticker(generation).await;

        log_info!(
            "session {} started, {} markers to find",
            session_id,
            self.catalog.len()
        );
        self.emit(GameEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    pub async fn can_accept(&self, marker_id: &str) -> bool {
        self.state.lock().await.can_accept(marker_id)
    }

    pub async fn on_marker_recognized(&self, marker_id: &str) -> RecognitionOutcome {
        let (outcome, generation, animation_seq, snapshot) = {
            let mut state = self.state.lock().await;
            let outcome = state.on_marker_recognized(marker_id);
            (
                outcome,
                state.generation(),
                state.animation_seq(),
                state.snapshot(),
            )
        };

        if matches!(
            outcome,
            RecognitionOutcome::AlreadyFound | RecognitionOutcome::Inactive
        ) {
            return outcome;
        }

        match &outcome {
            RecognitionOutcome::Accepted {
                marker_id,
                points,
                next_target,
            } => {
                log_info!(
                    "marker {} found (+{} points), next: {:?}",
                    marker_id,
                    points,
                    next_target
                );
                self.emit(GameEvent::MarkerFound(FoundItem {
                    marker_id: marker_id.clone(),
                    points: *points,
                }));

                self.schedule(self.found_animation, move |controller| async move {
                    controller
                        .hide_found_animation(generation, animation_seq)
                        .await;
                })
                .await;

                if outcome.completes_hunt() {
                    self.schedule(self.victory_delay, move |controller| async move {
                        controller.finish(generation, SessionOutcome::Won).await;
                    })
                    .await;
                }
            }
            RecognitionOutcome::Rejected { required } => {
                log_debug!("marker {} rejected, still need {:?}", marker_id, required);
                self.emit(GameEvent::MarkerRejected {
                    marker_id: marker_id.to_string(),
                    required: required.clone(),
                });
            }
            RecognitionOutcome::AlreadyFound | RecognitionOutcome::Inactive => {}
        }

        self.emit(GameEvent::StateChanged(snapshot));
        outcome
    }

    pub async fn request_hint(&self) -> HintResponse {
        let (response, snapshot) = {
            let mut state = self.state.lock().await;
            let response = state.request_hint();
            (response, state.snapshot())
        };

        if response == HintResponse::Inactive {
            return response;
        }
        if let HintResponse::Hint(hint) = &response {
            self.emit(GameEvent::HintRevealed(hint.clone()));
        }
        self.emit(GameEvent::StateChanged(snapshot));
        response
    }

    /// End the current session immediately.
    pub async fn end(&self, won: bool) {
        let generation = self.state.lock().await.generation();
        let outcome = if won {
            SessionOutcome::Won
        } else {
            SessionOutcome::Lost
        };
        self.finish(generation, outcome).await;
    }

    /// Tear the game screen down: nothing scheduled may touch the session
    /// afterwards.
    pub async fn exit(&self) {
        self.cancel_ticker().await;
        self.cancel_pending().await;
        self.overlays.lock().await.clear();

        let snapshot = {
            let mut state = self.state.lock().await;
            state.exit();
            state.snapshot()
        };
        log_info!("session {:?} exited", snapshot.session_id);
        self.emit(GameEvent::StateChanged(snapshot));
    }

    /// Apply one AR tracking update and tell the renderer what to draw.
    ///
    /// A marker coming into view is a recognition attempt unless it already
    /// carries a video; after that, tracking changes only pause or resume it.
    pub async fn handle_tracking_event(&self, event: TrackingEvent) -> Option<OverlayDirective> {
        let TrackingEvent {
            marker_id,
            is_tracked,
        } = event;

        let mut overlays = self.overlays.lock().await;
        let was_tracked = overlays.note_tracking(&marker_id, is_tracked);

        if overlays.has_player(&marker_id) {
            return overlays.update_playback(&marker_id, is_tracked);
        }
        if !is_tracked || was_tracked == Some(true) {
            return None;
        }

        match self.on_marker_recognized(&marker_id).await {
            RecognitionOutcome::Accepted { .. } => self
                .catalog
                .overlay_for(&marker_id)
                .map(|media| overlays.attach(&marker_id, media)),
            RecognitionOutcome::Rejected { .. } => {
                Some(OverlayDirective::ShowRejection { marker_id })
            }
            RecognitionOutcome::AlreadyFound | RecognitionOutcome::Inactive => None,
        }
    }

    async fn finish(&self, generation: u64, outcome: SessionOutcome) {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.generation() != generation || !state.end(outcome, Utc::now()) {
                return;
            }
            state.snapshot()
        };

        self.cancel_ticker().await;

        log_info!(
            "session {:?} ended ({:?}) with score {}",
            snapshot.session_id,
            outcome,
            snapshot.score
        );
        if let Some(summary) = snapshot.end_summary.clone() {
            self.emit(GameEvent::SessionEnded(summary));
        }
        self.emit(GameEvent::StateChanged(snapshot));
    }

    async fn hide_found_animation(&self, generation: u64, animation_seq: u64) {
        let snapshot = {
            let mut state = self.state.lock().await;
            if state.generation() != generation || !state.hide_found_animation(animation_seq) {
                return;
            }
            state.snapshot()
        };
        self.emit(GameEvent::StateChanged(snapshot));
    }

    async fn spawn_ticker(&self, generation: u64) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let period = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            loop {
                interval.tick().await;

                let (outcome, snapshot) = {
                    let mut state = controller.state.lock().await;
                    if state.generation() != generation {
                        break;
                    }
                    let outcome = state.tick(Utc::now());
                    (outcome, state.snapshot())
                };

                match outcome {
                    TickOutcome::Counting { .. } => {
                        controller.emit(GameEvent::StateChanged(snapshot));
                    }
                    TickOutcome::Frozen => {}
                    TickOutcome::Expired => {
                        log_info!(
                            "time is up for session {:?}, score {}",
                            snapshot.session_id,
                            snapshot.score
                        );
                        controller.cancel_pending().await;
                        if let Some(summary) = snapshot.end_summary.clone() {
                            controller.emit(GameEvent::SessionEnded(summary));
                        }
                        controller.emit(GameEvent::StateChanged(snapshot));
                        break;
                    }
                    TickOutcome::Inactive => break,
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    /// Run `task` once after `delay`, unless the session is torn down first.
    async fn schedule<F, Fut>(&self, delay: Duration, task: F)
    where
        F: FnOnce(GameController) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            time::sleep(delay).await;
            task(controller).await;
        });

        let mut pending = self.pending.lock().await;
        pending.retain(|handle| !handle.is_finished());
        pending.push(handle);
    }

    async fn cancel_pending(&self) {
        for handle in self.pending.lock().await.drain(..) {
            handle.abort();
        }
    }

    fn emit(&self, event: GameEvent) {
        log_debug!("emitting {}", event.name());
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::defaults::builtin_catalog;
    use crate::game::state::SessionPhase;

    fn controller_with(settings: GameSettings) -> GameController {
        GameController::new(Arc::new(builtin_catalog()), &settings)
    }

    fn controller() -> GameController {
        controller_with(GameSettings::default())
    }

    fn tracked(marker_id: &str, is_tracked: bool) -> TrackingEvent {
        TrackingEvent {
            marker_id: marker_id.into(),
            is_tracked,
        }
    }

    async fn find_all(controller: &GameController) {
        for marker in ["clue_1", "clue_2", "clue_5"] {
            assert!(controller.on_marker_recognized(marker).await.is_accepted());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn win_is_declared_after_victory_delay() {
        let controller = controller();
        controller.set_username("Ada").await.unwrap();
        controller.start().await;
        find_all(&controller).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Active);
        assert_eq!(snapshot.score, 100);
        assert_eq!(snapshot.found_count, 3);

        time::sleep(Duration::from_millis(1100)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Ended);
        let summary = snapshot.end_summary.unwrap();
        assert_eq!(summary.outcome, SessionOutcome::Won);
        assert_eq!(summary.message, "Ada, your final score: 100");
    }

    #[tokio::test(start_paused = true)]
    async fn countdown_runs_out() {
        let controller = controller_with(GameSettings {
            session_secs: 3,
            ..GameSettings::default()
        });
        controller.start().await;
        controller.on_marker_recognized("clue_1").await;

        time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(controller.snapshot().await.time_remaining_secs, 2);

        time::sleep(Duration::from_secs(2)).await;
        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Ended);
        assert_eq!(snapshot.time_remaining_secs, 0);
        assert_eq!(snapshot.score, 20);
        assert_eq!(snapshot.end_summary.unwrap().outcome, SessionOutcome::Lost);

        assert_eq!(
            controller.on_marker_recognized("clue_2").await,
            RecognitionOutcome::Inactive
        );
    }

    #[tokio::test(start_paused = true)]
    async fn exit_cancels_pending_victory() {
        let controller = controller();
        controller.start().await;
        find_all(&controller).await;
        controller.exit().await;

        time::sleep(Duration::from_secs(5)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert!(snapshot.end_summary.is_none());
        assert_eq!(snapshot.time_remaining_secs, 300);
    }

    #[tokio::test(start_paused = true)]
    async fn exit_mid_hunt_stops_the_countdown() {
        let controller = controller();
        controller.start().await;
        controller.on_marker_recognized("clue_1").await;

        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(controller.snapshot().await.time_remaining_secs, 298);

        controller.exit().await;
        time::sleep(Duration::from_secs(10)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Idle);
        assert_eq!(snapshot.time_remaining_secs, 298);
        assert_eq!(snapshot.score, 20);
        assert!(snapshot.end_summary.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_win_does_not_republish_unchanged_state() {
        let controller = controller_with(GameSettings {
            victory_delay_ms: 10_000,
            ..GameSettings::default()
        });
        controller.start().await;
        find_all(&controller).await;

        let mut events = controller.subscribe();
        time::sleep(Duration::from_millis(5500)).await;

        let mut republished = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, GameEvent::StateChanged(_)) {
                republished += 1;
            }
        }
        // Only the found-animation hide changes anything in this window.
        assert_eq!(republished, 1);
        assert_eq!(controller.snapshot().await.time_remaining_secs, 300);
        assert_eq!(controller.snapshot().await.phase, SessionPhase::Active);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_discards_previous_session_work() {
        let controller = controller();
        let first = controller.start().await;
        find_all(&controller).await;

        let second = controller.start().await;
        assert_ne!(first.session_id, second.session_id);

        time::sleep(Duration::from_millis(1500)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Active);
        assert_eq!(snapshot.score, 0);
        assert_eq!(snapshot.found_count, 0);
        assert_eq!(snapshot.time_remaining_secs, 299);
        assert_eq!(snapshot.current_target.as_deref(), Some("clue_1"));
    }

    #[tokio::test(start_paused = true)]
    async fn found_animation_hides_after_delay() {
        let controller = controller();
        controller.start().await;
        controller.on_marker_recognized("clue_1").await;
        assert!(controller.snapshot().await.found_animation.is_some());

        time::sleep(Duration::from_millis(1600)).await;

        let snapshot = controller.snapshot().await;
        assert!(snapshot.found_animation.is_none());
        assert_eq!(snapshot.last_found.unwrap().marker_id, "clue_1");
    }

    #[tokio::test(start_paused = true)]
    async fn manual_end_stops_the_clock() {
        let controller = controller();
        controller.start().await;
        controller.end(false).await;

        time::sleep(Duration::from_secs(3)).await;

        let snapshot = controller.snapshot().await;
        assert_eq!(snapshot.phase, SessionPhase::Ended);
        assert_eq!(snapshot.time_remaining_secs, 300);
        assert_eq!(controller.request_hint().await, HintResponse::Inactive);
    }

    #[tokio::test]
    async fn publishes_change_notifications() {
        let controller = controller();
        let mut events = controller.subscribe();

        controller.start().await;
        controller.on_marker_recognized("clue_2").await;
        controller.on_marker_recognized("clue_1").await;
        controller.on_marker_recognized("clue_1").await;
        controller.request_hint().await;

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.push(event.name());
        }
        assert_eq!(
            names,
            vec![
                "state-changed",
                "marker-rejected",
                "state-changed",
                "marker-found",
                "state-changed",
                "hint-revealed",
                "state-changed",
            ]
        );
        controller.exit().await;
    }

    #[tokio::test]
    async fn can_accept_follows_progress() {
        let controller = controller();
        assert!(!controller.can_accept("clue_1").await);

        controller.start().await;
        assert!(controller.can_accept("clue_1").await);
        assert!(!controller.can_accept("clue_2").await);

        controller.on_marker_recognized("clue_1").await;
        assert!(!controller.can_accept("clue_1").await);
        assert!(controller.can_accept("clue_2").await);
        controller.exit().await;
    }

    #[tokio::test]
    async fn tracking_events_drive_overlays() {
        let controller = controller();
        controller.start().await;

        let rejected = controller.handle_tracking_event(tracked("clue_2", true)).await;
        assert_eq!(
            rejected,
            Some(OverlayDirective::ShowRejection {
                marker_id: "clue_2".into()
            })
        );
        assert_eq!(
            controller.snapshot().await.current_clue,
            "You must find clue_1 first!"
        );

        let shown = controller.handle_tracking_event(tracked("clue_1", true)).await;
        assert!(matches!(
            shown,
            Some(OverlayDirective::ShowVideo { ref marker_id, .. }) if marker_id == "clue_1"
        ));
        assert_eq!(controller.snapshot().await.score, 20);

        assert_eq!(
            controller.handle_tracking_event(tracked("clue_1", false)).await,
            Some(OverlayDirective::Pause {
                marker_id: "clue_1".into()
            })
        );
        assert_eq!(
            controller.handle_tracking_event(tracked("clue_1", true)).await,
            Some(OverlayDirective::Play {
                marker_id: "clue_1".into()
            })
        );

        // Still in view from before: not a fresh sighting.
        assert_eq!(controller.handle_tracking_event(tracked("clue_2", true)).await, None);
        assert_eq!(controller.snapshot().await.score, 20);

        assert_eq!(controller.handle_tracking_event(tracked("clue_2", false)).await, None);
        let shown = controller.handle_tracking_event(tracked("clue_2", true)).await;
        assert!(matches!(shown, Some(OverlayDirective::ShowVideo { .. })));
        assert_eq!(controller.snapshot().await.score, 50);

        controller.exit().await;
    }
}
