// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition engine seam.
//
// A `RecognitionEngine` turns a conditioned raster into text under one
// segmentation mode. Engines are started once per run by an `EngineLauncher`
// with a fixed language set and model variant, and must be released exactly
// once when the run ends, whatever the outcome. `EngineSession` owns that
// lifecycle.

use ocrwerk_core::error::Result;
use ocrwerk_core::types::{LanguageSet, ModelVariant, SegmentationMode};
use tracing::debug;

use crate::image::raster::RasterImage;

/// Raw output of one recognition call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionOutput {
    pub text: String,
    /// Engine-reported confidence, nominally `[0, 100]`.
    pub confidence: f32,
}

impl RecognitionOutput {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Initialisation parameters fixed for the lifetime of one engine instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOptions {
    pub languages: LanguageSet,
    pub model: ModelVariant,
}

/// An external recognition capability.
///
/// Calls take `&mut self`: segmentation mode is engine-side state, so one
/// instance must never serve two calls at once.
pub trait RecognitionEngine: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Recognise `image` assuming the layout described by `mode`.
    ///
    /// Failures are reported as `OcrwerkError::RecognitionFailure`.
    fn recognize(
        &mut self,
        image: &RasterImage,
        mode: SegmentationMode,
        languages: &LanguageSet,
    ) -> Result<RecognitionOutput>;

    /// Tear down engine-side resources.
    fn release(&mut self);
}

/// Starts engines. One launch per run.
pub trait EngineLauncher: Send + Sync {
    fn launch(&self, options: &EngineOptions) -> Result<Box<dyn RecognitionEngine>>;
}

/// A started engine, released exactly once on `finish` or drop.
pub struct EngineSession {
    engine: Box<dyn RecognitionEngine>,
    options: EngineOptions,
    released: bool,
}

impl EngineSession {
    /// Launch an engine through `launcher`. Failure surfaces as
    /// `EngineInitFailure` from the launcher.
    pub fn start(launcher: &dyn EngineLauncher, options: EngineOptions) -> Result<Self> {
        let engine = launcher.launch(&options)?;
        debug!(engine = engine.name(), languages = %options.languages, "Engine started");
        Ok(Self {
            engine,
            options,
            released: false,
        })
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn languages(&self) -> &LanguageSet {
        &self.options.languages
    }

    pub fn recognize(
        &mut self,
        image: &RasterImage,
        mode: SegmentationMode,
    ) -> Result<RecognitionOutput> {
        self.engine.recognize(image, mode, &self.options.languages)
    }

    /// Release the engine now.
    pub fn finish(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.engine.release();
            debug!(engine = self.engine.name(), "Engine released");
        }
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.release();
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Reply, ScriptedLauncher};
    use super::*;
    use ocrwerk_core::error::OcrwerkError;

    fn options() -> EngineOptions {
        EngineOptions {
            languages: LanguageSet::default(),
            model: ModelVariant::LstmOnly,
        }
    }

    #[test]
    fn session_releases_once_on_finish() {
        let launcher = ScriptedLauncher::new(vec![Reply::Text("hello", 80.0)]);
        let mut session = EngineSession::start(&launcher, options()).unwrap();
        let image = RasterImage::new(4, 4);
        let out = session.recognize(&image, SegmentationMode::Auto).unwrap();
        assert_eq!(out.text, "hello");
        session.finish();
        assert_eq!(launcher.releases(), 1);
    }

    #[test]
    fn session_releases_on_drop() {
        let launcher = ScriptedLauncher::new(vec![]);
        {
            let _session = EngineSession::start(&launcher, options()).unwrap();
        }
        assert_eq!(launcher.releases(), 1);
    }

    #[test]
    fn failed_launch_has_nothing_to_release() {
        let mut launcher = ScriptedLauncher::new(vec![]);
        launcher.fail_launch = true;
        let result = EngineSession::start(&launcher, options());
        assert!(matches!(result, Err(OcrwerkError::EngineInitFailure(_))));
        assert_eq!(launcher.releases(), 0);
    }
}
