// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition orchestrator: runs one engine over a conditioned raster once
// per segmentation mode and collects the non-empty results.

use ocrwerk_core::cancel::CancellationToken;
use ocrwerk_core::config::RecognitionConfig;
use ocrwerk_core::error::{OcrwerkError, Result};
use ocrwerk_core::types::{RecognitionCandidate, SegmentationMode};
use tracing::{debug, info, instrument, warn};

use super::engine::EngineSession;
use crate::image::raster::RasterImage;
use crate::progress::ProgressTracker;

/// Progress at the start of the first recognition pass.
pub const PASSES_START: u8 = 20;
/// Progress once every pass (and the fallback, if any) has run.
pub const PASSES_END: u8 = 80;

/// Sequential multi-pass recognition with a single fallback pass.
#[derive(Debug, Clone)]
pub struct RecognitionOrchestrator {
    modes: Vec<SegmentationMode>,
    fallback: SegmentationMode,
}

impl RecognitionOrchestrator {
    pub fn new(modes: Vec<SegmentationMode>, fallback: SegmentationMode) -> Self {
        Self { modes, fallback }
    }

    pub fn from_config(config: &RecognitionConfig) -> Self {
        Self::new(config.modes.clone(), config.fallback_mode)
    }

    pub fn modes(&self) -> &[SegmentationMode] {
        &self.modes
    }

    fn pass_percent(&self, index: usize) -> u8 {
        let span = usize::from(PASSES_END - PASSES_START);
        let done = span * index / self.modes.len().max(1);
        PASSES_START + done as u8
    }

    /// Run every configured mode in order and return the candidates with
    /// non-blank text, in call order.
    ///
    /// Calls are strictly sequential against the one engine in `session`. A
    /// failed pass is logged and skipped. When no pass produced text, the
    /// fallback mode is tried exactly once before giving up with `NoResult`.
    /// Cancellation is checked before every call and once more after the
    /// last; a cancelled run returns `Cancelled` and no candidates.
    ///
    /// The session is consumed and its engine released on every path.
    #[instrument(skip_all, fields(engine = session.engine_name(), passes = self.modes.len()))]
    pub fn run(
        &self,
        mut session: EngineSession,
        image: &RasterImage,
        cancel: &CancellationToken,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<Vec<RecognitionCandidate>> {
        let total = self.modes.len();
        let mut candidates = Vec::with_capacity(total);

        for (index, &mode) in self.modes.iter().enumerate() {
            cancel.check()?;
            progress.report(
                self.pass_percent(index),
                format!("Recognizing text ({mode}, pass {} of {total})", index + 1),
            );
            if let Some(candidate) = attempt(&mut session, image, mode)? {
                candidates.push(candidate);
            }
        }
        cancel.check()?;

        if candidates.is_empty() {
            info!(fallback = %self.fallback, "No pass produced text, trying fallback");
            progress.report(PASSES_END, format!("Retrying ({})", self.fallback));
            if let Some(candidate) = attempt(&mut session, image, self.fallback)? {
                candidates.push(candidate);
            }
            cancel.check()?;
        }

        session.finish();
        progress.report(PASSES_END, "Recognition finished");

        if candidates.is_empty() {
            return Err(OcrwerkError::NoResult);
        }
        info!(candidates = candidates.len(), "Recognition passes complete");
        Ok(candidates)
    }
}

/// One engine call. `Ok(None)` for blank text or a recovered failure.
fn attempt(
    session: &mut EngineSession,
    image: &RasterImage,
    mode: SegmentationMode,
) -> Result<Option<RecognitionCandidate>> {
    match session.recognize(image, mode) {
        Ok(output) if output.text.trim().is_empty() => {
            debug!(%mode, "Pass produced no text");
            Ok(None)
        }
        Ok(output) => {
            debug!(
                %mode,
                confidence = output.confidence,
                chars = output.text.trim().chars().count(),
                "Pass produced text"
            );
            Ok(Some(RecognitionCandidate::new(
                output.text,
                output.confidence,
                mode,
            )))
        }
        Err(err) if err.is_cancelled() => Err(err),
        Err(err) => {
            warn!(%mode, %err, "Recognition pass failed, skipping");
            Ok(None)
        }
    }
}
