use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::game::{GameController, OverlayDirective};

use super::TrackingEvent;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Apply tracking updates to the controller one at a time, in arrival order.
pub async fn recognition_loop(
    controller: GameController,
    mut events: mpsc::Receiver<TrackingEvent>,
    directives: mpsc::UnboundedSender<OverlayDirective>,
    cancel_token: CancellationToken,
) {
    loop {
        tokio::select! {
            maybe_event = events.recv() => {
                let Some(event) = maybe_event else {
                    log_info!("tracking source closed, recognition loop exiting");
                    break;
                };

                log_debug!("tracking update {} (tracked: {})", event.marker_id, event.is_tracked);
                if let Some(directive) = controller.handle_tracking_event(event).await {
                    if directives.send(directive).is_err() {
                        log_warn!("renderer dropped its directive channel");
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("recognition loop shutting down");
                break;
            }
        }
    }
}
