use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GameSettings {
    /// Countdown length of a session.
    pub session_secs: u32,
    pub tick_interval_ms: u64,
    /// Pause between the last marker being found and the win being declared,
    /// so the final found animation gets shown.
    pub victory_delay_ms: u64,
    pub found_animation_ms: u64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            session_secs: 300,
            tick_interval_ms: 1000,
            victory_delay_ms: 1000,
            found_animation_ms: 1500,
        }
    }
}

impl GameSettings {
    /// Read settings from `path`. A missing file yields defaults; malformed
    /// content is logged and replaced by defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let settings = serde_json::from_str(&contents).unwrap_or_else(|err| {
            warn!("Ignoring malformed settings in {}: {err}", path.display());
            Self::default()
        });
        Ok(settings)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn victory_delay(&self) -> Duration {
        Duration::from_millis(self.victory_delay_ms)
    }

    pub fn found_animation(&self) -> Duration {
        Duration::from_millis(self.found_animation_ms)
    }
}
