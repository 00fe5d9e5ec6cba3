// src/config.rs
use crate::extractors::layout::DEFAULT_VERTICAL_TOLERANCE;
use crate::extractors::vocabulary::Language;
use std::path::PathBuf;

/// Settings for one extraction run. Passed explicitly to every stage.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Maximum baseline distance for two words to share a line.
    pub vertical_tolerance: f32,
    /// Used when a document carries neither marker phrase nor a language hint.
    pub default_language: Language,
    /// When set, segmented sections of every client are dumped here.
    pub debug_dir: Option<PathBuf>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            vertical_tolerance: DEFAULT_VERTICAL_TOLERANCE,
            default_language: Language::English,
            debug_dir: None,
        }
    }
}
