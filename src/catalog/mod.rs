pub mod defaults;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fs, path::Path};

/// Display size used when a marker's overlay does not declare one.
pub const DEFAULT_OVERLAY_SIZE: MediaSize = MediaSize {
    width: 1000,
    height: 1000,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaSize {
    pub width: u32,
    pub height: u32,
}

/// Video shown on top of a recognized marker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverlayMedia {
    /// Bundle resource name, without extension.
    pub resource: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default)]
    pub size: Option<MediaSize>,
}

fn default_extension() -> String {
    "mp4".into()
}

impl OverlayMedia {
    pub fn display_size(&self) -> MediaSize {
        self.size.unwrap_or(DEFAULT_OVERLAY_SIZE)
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.resource, self.extension)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarkerEntry {
    pub id: String,
    pub points: u32,
    #[serde(default)]
    pub hints: Vec<String>,
    #[serde(default)]
    pub overlay: Option<OverlayMedia>,
}

/// Ordered list of markers a hunt must be played through.
///
/// The position of each entry is its place in the required discovery order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerCatalog {
    markers: Vec<MarkerEntry>,
}

impl MarkerCatalog {
    pub fn new(markers: Vec<MarkerEntry>) -> Result<Self> {
        let catalog = Self { markers };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in hunt.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(defaults::builtin_catalog());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog from {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("Invalid catalog in {}", path.display()))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let catalog: MarkerCatalog = serde_json::from_str(contents)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<()> {
        if self.markers.is_empty() {
            bail!("catalog must contain at least one marker");
        }

        let mut seen = HashSet::new();
        let mut total_points: u32 = 0;
        for entry in &self.markers {
            if entry.id.trim().is_empty() {
                bail!("marker id must not be empty");
            }
            if !seen.insert(entry.id.as_str()) {
                bail!("duplicate marker id `{}`", entry.id);
            }
            total_points = match total_points.checked_add(entry.points) {
                Some(total) => total,
                None => bail!("total points overflow at marker `{}`", entry.id),
            };
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Marker id required at `position` in the discovery order.
    pub fn id_at(&self, position: usize) -> Option<&str> {
        self.markers.get(position).map(|entry| entry.id.as_str())
    }

    pub fn get(&self, marker_id: &str) -> Option<&MarkerEntry> {
        self.markers.iter().find(|entry| entry.id == marker_id)
    }

    pub fn points_for(&self, marker_id: &str) -> u32 {
        self.get(marker_id).map(|entry| entry.points).unwrap_or(0)
    }

    pub fn hints_for(&self, marker_id: &str) -> &[String] {
        self.get(marker_id)
            .map(|entry| entry.hints.as_slice())
            .unwrap_or(&[])
    }

    pub fn overlay_for(&self, marker_id: &str) -> Option<&OverlayMedia> {
        self.get(marker_id).and_then(|entry| entry.overlay.as_ref())
    }

    pub fn order(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(|entry| entry.id.as_str())
    }
}

impl Default for MarkerCatalog {
    fn default() -> Self {
        defaults::builtin_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, points: u32) -> MarkerEntry {
        MarkerEntry {
            id: id.into(),
            points,
            hints: Vec::new(),
            overlay: None,
        }
    }

    #[test]
    fn parses_json_in_declared_order() {
        let json = r#"{
            "markers": [
                { "id": "tree", "points": 10, "hints": ["tall"],
                  "overlay": { "resource": "tree_clip", "size": { "width": 640, "height": 480 } } },
                { "id": "bench", "points": 5 }
            ]
        }"#;

        let catalog = MarkerCatalog::from_json(json).unwrap();
        assert_eq!(catalog.order().collect::<Vec<_>>(), vec!["tree", "bench"]);
        assert_eq!(catalog.points_for("bench"), 5);
        assert_eq!(catalog.hints_for("tree"), ["tall".to_string()]);
        assert!(catalog.hints_for("bench").is_empty());

        let overlay = catalog.overlay_for("tree").unwrap();
        assert_eq!(overlay.file_name(), "tree_clip.mp4");
        assert_eq!(overlay.display_size(), MediaSize { width: 640, height: 480 });
        assert!(catalog.overlay_for("bench").is_none());
    }

    #[test]
    fn overlay_without_size_uses_default() {
        let overlay = OverlayMedia {
            resource: "x".into(),
            extension: "mov".into(),
            size: None,
        };
        assert_eq!(overlay.display_size(), DEFAULT_OVERLAY_SIZE);
    }

    #[test]
    fn rejects_empty_and_duplicate_catalogs() {
        assert!(MarkerCatalog::new(Vec::new()).is_err());
        assert!(MarkerCatalog::new(vec![entry("a", 1), entry("a", 2)]).is_err());
        assert!(MarkerCatalog::new(vec![entry("  ", 1)]).is_err());
        assert!(MarkerCatalog::from_json(r#"{ "markers": [] }"#).is_err());
    }

    #[test]
    fn rejects_catalog_whose_points_overflow_the_score() {
        let err = MarkerCatalog::new(vec![entry("a", 3_000_000_000), entry("b", 3_000_000_000)])
            .unwrap_err();
        assert!(err.to_string().contains("overflow"));

        let json = r#"{ "markers": [
            { "id": "a", "points": 4294967295 },
            { "id": "b", "points": 1 }
        ] }"#;
        assert!(MarkerCatalog::from_json(json).is_err());

        assert!(MarkerCatalog::new(vec![entry("a", u32::MAX - 1), entry("b", 1)]).is_ok());
    }

    #[test]
    fn unknown_marker_has_no_points_or_hints() {
        let catalog = MarkerCatalog::new(vec![entry("a", 1)]).unwrap();
        assert_eq!(catalog.points_for("zzz"), 0);
        assert!(catalog.hints_for("zzz").is_empty());
        assert_eq!(catalog.id_at(0), Some("a"));
        assert_eq!(catalog.id_at(1), None);
    }

    #[test]
    fn missing_file_falls_back_to_builtin_hunt() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = MarkerCatalog::load_or_default(&dir.path().join("catalog.json")).unwrap();
        assert_eq!(catalog, defaults::builtin_catalog());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(MarkerCatalog::load_or_default(&path).is_err());
    }
}
