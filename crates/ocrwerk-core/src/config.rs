// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration: preprocessing profiles, recognition passes, rendering, and
// text sanitizing thresholds.
//
// The numeric defaults below were tuned empirically against Thai/English
// scans and have no documented derivation. Recalibrate against a labelled
// corpus before relying on them.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OcrwerkError, Result};
use crate::types::{LanguageSet, ModelVariant, Profile, SegmentationMode, SourceKind, TargetScript};

/// Largest raster, in pixels, a resize or page render may produce (400 MB as
/// RGBA).
pub const MAX_RASTER_PIXELS: u64 = 100_000_000;

/// Thresholds for run-based border/rule-line removal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BorderRemovalConfig {
    /// Pixels with luminance strictly below this count as dark.
    pub dark_threshold: f32,
    /// Longest dark run must exceed this fraction of the axis length.
    pub min_run_ratio: f32,
    /// Total dark pixels must exceed this fraction of the axis length.
    pub min_coverage_ratio: f32,
}

impl Default for BorderRemovalConfig {
    fn default() -> Self {
        Self {
            dark_threshold: 120.0,
            min_run_ratio: 0.95,
            min_coverage_ratio: 0.9,
        }
    }
}

/// Stage toggles and parameters for one preprocessing run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Contrast multiplier, 1.0 = unchanged. Clamped to `[0, 2]`.
    pub contrast: f32,
    /// Additive brightness offset applied after contrast.
    pub brightness: f32,
    pub grayscale: bool,
    /// Sharpen kernel intensity; `None` disables the stage.
    pub sharpen: Option<f32>,
    /// Otsu binarization (Enhanced only).
    pub binarize: bool,
    /// 3x3 median denoise (Enhanced only).
    pub denoise: bool,
    /// Max-filter passes (Enhanced only).
    pub dilate_iterations: u32,
    pub remove_borders: bool,
    /// Nearest-neighbour pre-scale factor, 1.0 = unchanged.
    pub pre_scale: f32,
    pub profile: Profile,
    pub borders: BorderRemovalConfig,
}

impl PipelineConfig {
    /// Light-touch conditioning for already legible sources.
    pub fn standard() -> Self {
        Self {
            contrast: 1.3,
            brightness: 15.0,
            grayscale: true,
            sharpen: Some(1.0),
            binarize: false,
            denoise: false,
            dilate_iterations: 0,
            remove_borders: false,
            pre_scale: 1.0,
            profile: Profile::Standard,
            borders: BorderRemovalConfig::default(),
        }
    }

    /// Full conditioning stack for noisy printed scans.
    pub fn enhanced() -> Self {
        Self {
            contrast: 1.5,
            brightness: 25.0,
            grayscale: true,
            sharpen: Some(1.5),
            binarize: true,
            denoise: true,
            dilate_iterations: 0,
            remove_borders: false,
            pre_scale: 1.0,
            profile: Profile::Enhanced,
            borders: BorderRemovalConfig::default(),
        }
    }

    pub fn for_profile(profile: Profile) -> Self {
        match profile {
            Profile::Standard => Self::standard(),
            Profile::Enhanced => Self::enhanced(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Which recognition passes to run and how the engine is started.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Passes, in call order.
    pub modes: Vec<SegmentationMode>,
    /// Single retry mode when every pass came back empty.
    pub fallback_mode: SegmentationMode,
    pub languages: LanguageSet,
    pub model: ModelVariant,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            modes: vec![
                SegmentationMode::Auto,
                SegmentationMode::SingleColumn,
                SegmentationMode::SingleBlock,
            ],
            fallback_mode: SegmentationMode::SingleBlock,
            languages: LanguageSet::default(),
            model: ModelVariant::LstmOnly,
        }
    }
}

/// Paged-document rasterisation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Pixels per PDF point for a single page.
    pub scale: f32,
    /// Pixels per PDF point when every page of a document is read. Lower
    /// than `scale` to bound time and memory on long documents.
    pub all_pages_scale: f32,
    /// Zero-based page to process.
    pub page_index: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 4.0,
            all_pages_scale: 2.0,
            page_index: 0,
        }
    }
}

/// Ratios used by the sanitizer's noise and abnormal-line filters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseFilterConfig {
    /// A line is scrubbed when its symbol ratio exceeds this...
    pub scrub_symbol_ratio: f32,
    /// ...and its alphanumeric ratio is below this.
    pub scrub_alnum_ratio: f32,
    /// Minimum run of digits dropped as a barcode.
    pub barcode_min_digits: usize,
    pub rule_char_ratio: f32,
    pub non_word_ratio: f32,
    /// Only lines shorter than this are subject to the non-word rule.
    pub non_word_max_len: usize,
    pub drop_symbol_ratio: f32,
    /// Lines over `drop_symbol_ratio` survive with at least this many alphanumerics.
    pub drop_min_alnum: usize,
}

impl Default for NoiseFilterConfig {
    fn default() -> Self {
        Self {
            scrub_symbol_ratio: 0.3,
            scrub_alnum_ratio: 0.3,
            barcode_min_digits: 12,
            rule_char_ratio: 0.8,
            non_word_ratio: 0.75,
            non_word_max_len: 10,
            drop_symbol_ratio: 0.6,
            drop_min_alnum: 3,
        }
    }
}

/// Literal known-misread replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub from: String,
    pub to: String,
}

impl Correction {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Sanitizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub noise: NoiseFilterConfig,
    pub corrections: Vec<Correction>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            noise: NoiseFilterConfig::default(),
            corrections: vec![
                Correction::new("f23%9e3", "f239e3"),
                Correction::new("เวิป", "เว็บ"),
                Correction::new("เวป", "เว็บ"),
            ],
        }
    }
}

impl SanitizerConfig {
    /// Reject correction tables that could keep rewriting their own output:
    /// no replacement may contain any correction's search text.
    pub fn validate(&self) -> Result<()> {
        for fix in &self.corrections {
            if let Some(other) = self
                .corrections
                .iter()
                .find(|other| !other.from.is_empty() && fix.to.contains(&other.from))
            {
                return Err(OcrwerkError::InvalidConfig(format!(
                    "correction {:?} -> {:?} reintroduces {:?}",
                    fix.from, fix.to, other.from
                )));
            }
        }
        Ok(())
    }
}

/// Top-level settings for a document processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrwerkConfig {
    /// Conditioning applied to decoded image inputs.
    pub image_pipeline: PipelineConfig,
    /// Conditioning applied to rendered document pages.
    pub page_pipeline: PipelineConfig,
    pub recognition: RecognitionConfig,
    pub render: RenderConfig,
    pub target_script: TargetScript,
    pub sanitizer: SanitizerConfig,
}

impl Default for OcrwerkConfig {
    fn default() -> Self {
        Self {
            image_pipeline: PipelineConfig::standard(),
            page_pipeline: PipelineConfig::standard(),
            recognition: RecognitionConfig::default(),
            render: RenderConfig::default(),
            target_script: TargetScript::default(),
            sanitizer: SanitizerConfig::default(),
        }
    }
}

impl OcrwerkConfig {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Write settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// The preprocessing configuration for a given input provenance.
    pub fn pipeline_for(&self, source: SourceKind) -> &PipelineConfig {
        match source {
            SourceKind::Image => &self.image_pipeline,
            SourceKind::RenderedPage => &self.page_pipeline,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.recognition.modes.is_empty() {
            return Err(OcrwerkError::InvalidConfig(
                "at least one segmentation mode is required".into(),
            ));
        }
        if self.recognition.languages.is_empty() {
            return Err(OcrwerkError::InvalidConfig(
                "at least one recognition language is required".into(),
            ));
        }
        for (name, scale) in [
            ("render.scale", self.render.scale),
            ("render.all_pages_scale", self.render.all_pages_scale),
        ] {
            if !scale.is_finite() || scale <= 0.0 {
                return Err(OcrwerkError::InvalidConfig(format!(
                    "{name} must be a positive number, got {scale}"
                )));
            }
        }
        for (name, pipeline) in [
            ("image_pipeline", &self.image_pipeline),
            ("page_pipeline", &self.page_pipeline),
        ] {
            if !pipeline.pre_scale.is_finite() || pipeline.pre_scale <= 0.0 {
                return Err(OcrwerkError::InvalidConfig(format!(
                    "{name}.pre_scale must be a positive number, got {}",
                    pipeline.pre_scale
                )));
            }
        }
        self.sanitizer.validate()?;
        if self.target_script.ranges.iter().any(|r| r.first > r.last) {
            return Err(OcrwerkError::InvalidConfig(format!(
                "target script {} has an inverted character range",
                self.target_script.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OcrwerkConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.recognition.modes.len(), 3);
        assert_eq!(config.recognition.fallback_mode, SegmentationMode::SingleBlock);
        assert_eq!(config.render.scale, 4.0);
    }

    #[test]
    fn profiles_differ_in_heavy_stages() {
        let standard = PipelineConfig::standard();
        let enhanced = PipelineConfig::enhanced();
        assert!(!standard.binarize && !standard.denoise);
        assert!(enhanced.binarize && enhanced.denoise);
        assert_eq!(enhanced.profile, Profile::Enhanced);
        assert_eq!(PipelineConfig::for_profile(Profile::Standard), standard);
    }

    #[test]
    fn empty_modes_rejected() {
        let mut config = OcrwerkConfig::default();
        config.recognition.modes.clear();
        assert!(matches!(
            config.validate(),
            Err(OcrwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn bad_scale_rejected() {
        let mut config = OcrwerkConfig::default();
        config.render.scale = 0.0;
        assert!(config.validate().is_err());
        let mut config = OcrwerkConfig::default();
        config.page_pipeline.pre_scale = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn all_pages_scale_defaults_lower_and_is_validated() {
        let config = OcrwerkConfig::default();
        assert_eq!(config.render.all_pages_scale, 2.0);

        let mut config = OcrwerkConfig::default();
        config.render.all_pages_scale = -1.0;
        assert!(matches!(
            config.validate(),
            Err(OcrwerkError::InvalidConfig(_))
        ));
    }

    #[test]
    fn self_feeding_corrections_rejected() {
        let mut config = OcrwerkConfig::default();
        config.sanitizer.corrections.push(Correction::new("ab", "xaby"));
        assert!(matches!(
            config.validate(),
            Err(OcrwerkError::InvalidConfig(_))
        ));

        // A replacement that produces another entry's search text also loops.
        let sanitizer = SanitizerConfig {
            corrections: vec![Correction::new("a", "b"), Correction::new("b", "aa")],
            ..SanitizerConfig::default()
        };
        assert!(sanitizer.validate().is_err());

        assert!(SanitizerConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: OcrwerkConfig =
            serde_json::from_str(r#"{ "render": { "page_index": 2 } }"#).unwrap();
        assert_eq!(config.render.page_index, 2);
        assert_eq!(config.render.scale, 4.0);
        assert_eq!(config.recognition, RecognitionConfig::default());
    }

    #[test]
    fn save_then_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocrwerk.json");

        let mut config = OcrwerkConfig::default();
        config.image_pipeline = PipelineConfig::enhanced();
        config.recognition.modes = vec![SegmentationMode::SparseText];
        config.save(&path).unwrap();

        let loaded = OcrwerkConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = OcrwerkConfig::load("/nonexistent/ocrwerk.json");
        assert!(matches!(result, Err(OcrwerkError::Io(_))));
    }
}
