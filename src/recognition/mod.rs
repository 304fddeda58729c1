pub mod feed;
pub mod loop_worker;

use serde::{Deserialize, Serialize};

pub use feed::{RecognitionFeed, TrackingSender};

/// One update from the AR subsystem about an image marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub marker_id: String,
    pub is_tracked: bool,
}
