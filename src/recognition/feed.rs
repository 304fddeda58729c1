use anyhow::{anyhow, bail, Context, Result};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::game::{GameController, OverlayDirective};

use super::{loop_worker::recognition_loop, TrackingEvent};

const TRACKING_QUEUE_DEPTH: usize = 64;

/// Handle the AR subsystem uses to hand tracking updates to the game.
///
/// Clone it freely; every clone feeds the same loop.
#[derive(Clone)]
pub struct TrackingSender {
    tx: mpsc::Sender<TrackingEvent>,
}

impl TrackingSender {
    pub async fn send(&self, marker_id: impl Into<String>, is_tracked: bool) -> Result<()> {
        self.tx
            .send(TrackingEvent {
                marker_id: marker_id.into(),
                is_tracked,
            })
            .await
            .map_err(|_| anyhow!("recognition feed is not running"))
    }

    /// For detection callbacks running on a plain (non-runtime) thread.
    /// Panics if called from inside an async context.
    pub fn blocking_send(&self, marker_id: impl Into<String>, is_tracked: bool) -> Result<()> {
        self.tx
            .blocking_send(TrackingEvent {
                marker_id: marker_id.into(),
                is_tracked,
            })
            .map_err(|_| anyhow!("recognition feed is not running"))
    }
}

/// Marshals tracking updates from the AR thread onto the game controller.
pub struct RecognitionFeed {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl RecognitionFeed {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Spawn the loop. Overlay directives produced by tracking updates are
    /// forwarded to `directives`.
    pub fn start(
        &mut self,
        controller: GameController,
        directives: mpsc::UnboundedSender<OverlayDirective>,
    ) -> Result<TrackingSender> {
        if self.handle.is_some() {
            bail!("recognition feed already active");
        }

        let (tx, rx) = mpsc::channel(TRACKING_QUEUE_DEPTH);
        let cancel_token = CancellationToken::new();

        let handle = tokio::spawn(recognition_loop(
            controller,
            rx,
            directives,
            cancel_token.clone(),
        ));

        info!("recognition feed started");
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(TrackingSender { tx })
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("recognition loop task failed to join")
        } else {
            Ok(())
        }
    }
}

impl Default for RecognitionFeed {
    fn default() -> Self {
        Self::new()
    }
}
