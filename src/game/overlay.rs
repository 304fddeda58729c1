use serde::Serialize;
use std::collections::HashMap;

use crate::catalog::{MediaSize, OverlayMedia};

/// Instruction for the rendering collaborator.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum OverlayDirective {
    /// Attach a looping video plane to the marker.
    ShowVideo {
        marker_id: String,
        media: OverlayMedia,
        size: MediaSize,
    },
    /// Tint the marker red: found out of order.
    ShowRejection { marker_id: String },
    Play { marker_id: String },
    Pause { marker_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Playback {
    Playing,
    Paused,
}

/// Renderer-side bookkeeping: which markers carry a video, whether it is
/// playing, and whether each marker was in view on its last update.
#[derive(Debug, Default)]
pub struct OverlayTracker {
    players: HashMap<String, Playback>,
    tracked: HashMap<String, bool>,
}

impl OverlayTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tracking flag for `marker_id`, returning the previous one.
    pub fn note_tracking(&mut self, marker_id: &str, is_tracked: bool) -> Option<bool> {
        self.tracked.insert(marker_id.to_string(), is_tracked)
    }

    pub fn has_player(&self, marker_id: &str) -> bool {
        self.players.contains_key(marker_id)
    }

    /// Attach a video overlay for an accepted marker. The video starts playing.
    pub fn attach(&mut self, marker_id: &str, media: &OverlayMedia) -> OverlayDirective {
        self.players.insert(marker_id.to_string(), Playback::Playing);
        OverlayDirective::ShowVideo {
            marker_id: marker_id.to_string(),
            media: media.clone(),
            size: media.display_size(),
        }
    }

    /// Play while tracked, pause otherwise. `None` when nothing changes.
    pub fn update_playback(&mut self, marker_id: &str, is_tracked: bool) -> Option<OverlayDirective> {
        let playback = self.players.get_mut(marker_id)?;
        let wanted = if is_tracked {
            Playback::Playing
        } else {
            Playback::Paused
        };
        if *playback == wanted {
            return None;
        }
        *playback = wanted;

        let marker_id = marker_id.to_string();
        Some(match wanted {
            Playback::Playing => OverlayDirective::Play { marker_id },
            Playback::Paused => OverlayDirective::Pause { marker_id },
        })
    }

    pub fn clear(&mut self) {
        self.players.clear();
        self.tracked.clear();
    }
}
