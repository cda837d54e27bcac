// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pure-Rust recognition engine backed by the `ocrs` crate, with neural network
// models executed via `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// ocrwerk-document = { path = "crates/ocrwerk-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`): locates text regions in the image.
// - **Recognition model** (`text-recognition.rten`): decodes characters from detected regions.
//
// Running the `ocrs-cli` tool once downloads them to the default cache
// directory, `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`).
//
// The published recognition model covers Latin script only, and ocrs reports
// no confidence. Every pass is given `NOMINAL_CONFIDENCE`, which leaves the
// ranking between passes to text quality.

use std::path::{Path, PathBuf};

use ocrs::{ImageSource, OcrEngine as OcrsInner, OcrEngineParams, OcrInput};
use ocrwerk_core::error::{OcrwerkError, Result};
use ocrwerk_core::types::{LanguageSet, SegmentationMode};
use rten::Model;
use tracing::{debug, info, instrument, warn};

use super::engine::{EngineLauncher, EngineOptions, RecognitionEngine, RecognitionOutput};
use crate::image::raster::RasterImage;

/// Confidence attached to every ocrs result.
pub const NOMINAL_CONFIDENCE: f32 = 75.0;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Model file locations for [`OcrsLauncher`].
#[derive(Debug, Clone)]
pub struct OcrsModelPaths {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrsModelPaths {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsModelPaths {
    /// Expects `text-detection.rten` and `text-recognition.rten` inside `dir`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (role, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(OcrwerkError::EngineInitFailure(format!(
                    "{role} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Loads the ocrs models for each run.
#[derive(Debug, Clone, Default)]
pub struct OcrsLauncher {
    paths: OcrsModelPaths,
}

impl OcrsLauncher {
    pub fn new(paths: OcrsModelPaths) -> Self {
        Self { paths }
    }

    pub fn from_model_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(OcrsModelPaths::from_dir(dir))
    }
}

impl EngineLauncher for OcrsLauncher {
    /// Model loading is the expensive step. The `ocrs` and `rten` crates
    /// should be built in release mode; debug builds are very slow.
    #[instrument(skip_all, fields(
        detection = %self.paths.detection_model_path.display(),
        recognition = %self.paths.recognition_model_path.display(),
    ))]
    fn launch(&self, options: &EngineOptions) -> Result<Box<dyn RecognitionEngine>> {
        self.paths.validate()?;
        if options.languages.iter().any(|lang| lang != "eng") {
            warn!(
                languages = %options.languages,
                "ocrs models recognise Latin script only"
            );
        }

        info!("Loading OCR detection model");
        let detection_model = load_model(&self.paths.detection_model_path, "detection")?;
        info!("Loading OCR recognition model");
        let recognition_model = load_model(&self.paths.recognition_model_path, "recognition")?;

        let engine = OcrsInner::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            OcrwerkError::EngineInitFailure(format!("failed to initialise ocrs engine: {err}"))
        })?;

        info!("ocrs engine initialised");
        Ok(Box::new(OcrsEngine {
            engine: Some(engine),
        }))
    }
}

fn load_model(path: &Path, role: &str) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        OcrwerkError::EngineInitFailure(format!(
            "failed to load {role} model from {}: {err}",
            path.display()
        ))
    })
}

/// ocrs-backed engine. `release` drops the loaded models.
pub struct OcrsEngine {
    engine: Option<OcrsInner>,
}

impl OcrsEngine {
    fn prepare(engine: &OcrsInner, image: &RasterImage, mode: SegmentationMode) -> Result<OcrInput> {
        let rgb = image::DynamicImage::ImageRgba8(image.clone()).into_rgb8();
        let (width, height) = rgb.dimensions();
        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            OcrwerkError::RecognitionFailure {
                mode,
                detail: format!("failed to create image source ({width}x{height}): {err}"),
            }
        })?;
        engine
            .prepare_input(source)
            .map_err(|err| OcrwerkError::RecognitionFailure {
                mode,
                detail: format!("ocrs preprocessing failed: {err}"),
            })
    }

    /// Detect words, group them into lines, and recognise each line.
    fn layout_text(engine: &OcrsInner, input: &OcrInput, mode: SegmentationMode) -> Result<String> {
        let failure = |detail: String| OcrwerkError::RecognitionFailure { mode, detail };

        let word_rects = engine
            .detect_words(input)
            .map_err(|err| failure(format!("word detection failed: {err}")))?;
        debug!(word_count = word_rects.len(), "Words detected");

        let line_rects = engine.find_text_lines(input, &word_rects);
        debug!(line_count = line_rects.len(), "Text lines found");

        let line_texts = engine
            .recognize_text(input, &line_rects)
            .map_err(|err| failure(format!("line recognition failed: {err}")))?;

        let lines: Vec<String> = line_texts
            .iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|text| !text.trim().is_empty())
            .collect();
        Ok(lines.join("\n"))
    }
}

impl RecognitionEngine for OcrsEngine {
    fn name(&self) -> &'static str {
        "ocrs"
    }

    /// `Auto` and `SingleBlock` use ocrs' own reading order; column and
    /// sparse modes go through explicit line detection.
    #[instrument(skip_all, fields(mode = %mode, width = image.width(), height = image.height()))]
    fn recognize(
        &mut self,
        image: &RasterImage,
        mode: SegmentationMode,
        _languages: &LanguageSet,
    ) -> Result<RecognitionOutput> {
        let Some(engine) = self.engine.as_ref() else {
            return Err(OcrwerkError::RecognitionFailure {
                mode,
                detail: "engine already released".into(),
            });
        };

        let input = Self::prepare(engine, image, mode)?;
        let text = match mode {
            SegmentationMode::Auto | SegmentationMode::SingleBlock => {
                engine
                    .get_text(&input)
                    .map_err(|err| OcrwerkError::RecognitionFailure {
                        mode,
                        detail: format!("ocrs text recognition failed: {err}"),
                    })?
            }
            SegmentationMode::SingleColumn | SegmentationMode::SparseText => {
                Self::layout_text(engine, &input, mode)?
            }
        };

        debug!(
            line_count = text.lines().count(),
            char_count = text.chars().count(),
            "ocrs pass complete"
        );
        Ok(RecognitionOutput::new(text, NOMINAL_CONFIDENCE))
    }

    fn release(&mut self) {
        self.engine = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocrwerk_core::types::ModelVariant;

    #[test]
    fn model_paths_from_dir() {
        let paths = OcrsModelPaths::from_dir("/tmp/my-models");
        assert_eq!(
            paths.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
        assert_eq!(
            paths.recognition_model_path,
            PathBuf::from("/tmp/my-models/text-recognition.rten")
        );
    }

    #[test]
    fn default_paths_end_with_model_filenames() {
        let paths = OcrsModelPaths::default();
        assert!(paths
            .detection_model_path
            .to_string_lossy()
            .ends_with(DETECTION_MODEL_FILENAME));
        assert!(paths
            .recognition_model_path
            .to_string_lossy()
            .ends_with(RECOGNITION_MODEL_FILENAME));
    }

    #[test]
    fn missing_models_fail_to_launch() {
        let launcher = OcrsLauncher::from_model_dir("/nonexistent/path/ocr-models");
        let options = EngineOptions {
            languages: LanguageSet::new(["eng"]),
            model: ModelVariant::LstmOnly,
        };
        let result = launcher.launch(&options);
        assert!(matches!(result, Err(OcrwerkError::EngineInitFailure(_))));
    }
}
