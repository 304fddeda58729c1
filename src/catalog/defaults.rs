use super::{MarkerCatalog, MarkerEntry, MediaSize, OverlayMedia};

const CLIP_SIZE: MediaSize = MediaSize {
    width: 768,
    height: 1280,
};

fn marker(id: &str, points: u32, hints: [&str; 3]) -> MarkerEntry {
    MarkerEntry {
        id: id.into(),
        points,
        hints: hints.iter().map(|hint| hint.to_string()).collect(),
        overlay: Some(OverlayMedia {
            resource: id.into(),
            extension: "mp4".into(),
            size: Some(CLIP_SIZE),
        }),
    }
}

/// The hunt shipped with the app: three clips, ending at the treasure chest.
pub fn builtin_catalog() -> MarkerCatalog {
    MarkerCatalog {
        markers: vec![
            marker(
                "clue_1",
                20,
                [
                    "I stand tall, giving shade.",
                    "With green arms, I sway high",
                    "With green arms, I sway high",
                ],
            ),
            marker(
                "clue_2",
                30,
                [
                    "I hold stories, turn my pages.",
                    "Words and wisdom, stacked in rows.",
                    "Find me where knowledge flows.",
                ],
            ),
            marker(
                "clue_5",
                50,
                [
                    "Find the chest, claim your prize.",
                    "Golden lock, secrets inside.",
                    "Your journey ends where treasures hide.",
                ],
            ),
        ],
    }
}
