use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tolerances and zones used by the per-page marker detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Vertical tolerance for clustering words into lines when the OCR
    /// hierarchy is missing.
    pub line_tolerance_px: f32,
    /// Fraction of the page height searched for dates.
    pub date_region: f32,
    /// A label paragraph above a date may hold at most this many words.
    pub date_label_max_words: usize,
    pub date_label_alignment_px: f32,
    pub recipient_zone_height: f32,
    pub recipient_zone_width: f32,
    pub address_gap_px: f32,
    pub address_alignment_px: f32,
    pub address_max_lines_above: usize,
    /// Postal code of the expected recipient; an exact match outranks
    /// every other address candidate on the page.
    pub target_zip: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            line_tolerance_px: 10.0,
            date_region: 0.40,
            date_label_max_words: 3,
            date_label_alignment_px: 50.0,
            recipient_zone_height: 0.30,
            recipient_zone_width: 0.50,
            address_gap_px: 50.0,
            address_alignment_px: 30.0,
            address_max_lines_above: 4,
            target_zip: None,
        }
    }
}

impl DetectorConfig {
    pub fn with_target_zip(mut self, zip: impl Into<String>) -> Self {
        self.target_zip = Some(zip.into());
        self
    }
}

/// Thresholds of the transition scorer and the letter grouper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// A transition scoring strictly above this starts a new letter.
    pub split_threshold: i32,
    /// Printed "page 1" strictly inside this vertical band is treated as an
    /// in-body mention rather than a header or footer.
    pub middle_band: (f32, f32),
    pub top_third: f32,
    pub top_half: f32,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            split_threshold: 500,
            middle_band: (0.3, 0.7),
            top_third: 0.33,
            top_half: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LetterConfig {
    pub detector: DetectorConfig,
    pub splitter: SplitterConfig,
    /// Size of the global rayon pool; `None` keeps rayon's default.
    pub max_threads: Option<usize>,
}

impl LetterConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn install_global_thread_pool(&self) -> Result<bool, rayon::ThreadPoolBuildError> {
        if let Some(num_threads) = self.max_threads {
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
