pub mod catalog;
pub mod game;
pub mod recognition;
pub mod settings;
pub mod utils;

use anyhow::Result;
use log::info;
use std::{path::Path, sync::Arc};

pub use catalog::MarkerCatalog;
pub use game::{GameController, GameEvent, GameSnapshot, OverlayDirective};
pub use recognition::{RecognitionFeed, TrackingEvent, TrackingSender};
pub use settings::GameSettings;
pub use utils::logging::init_logging;

pub const CATALOG_FILE: &str = "catalog.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Everything a host app needs to run a hunt, built once at app start and
/// handed to the presentation and rendering layers.
pub struct HuntApp {
    catalog: Arc<MarkerCatalog>,
    settings: GameSettings,
    controller: GameController,
}

impl HuntApp {
    pub fn new(catalog: MarkerCatalog, settings: GameSettings) -> Self {
        let catalog = Arc::new(catalog);
        let controller = GameController::new(catalog.clone(), &settings);
        Self {
            catalog,
            settings,
            controller,
        }
    }

    /// Built-in hunt with default timings.
    pub fn with_defaults() -> Self {
        Self::new(MarkerCatalog::default(), GameSettings::default())
    }

    /// Load `catalog.json` and `settings.json` from `config_dir`; either file
    /// may be absent.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let catalog = MarkerCatalog::load_or_default(&config_dir.join(CATALOG_FILE))?;
        let settings = GameSettings::load(&config_dir.join(SETTINGS_FILE))?;

        info!(
            "hunt loaded from {}: {} markers, {}s sessions",
            config_dir.display(),
            catalog.len(),
            settings.session_secs
        );
        Ok(Self::new(catalog, settings))
    }

    pub fn controller(&self) -> &GameController {
        &self.controller
    }

    pub fn catalog(&self) -> &MarkerCatalog {
        &self.catalog
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }
}
