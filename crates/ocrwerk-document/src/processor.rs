// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document processor: the single entry point the shell calls. One call is one
// independent run: load or render, condition, recognise, fuse, sanitize.

use ocrwerk_core::cancel::CancellationToken;
use ocrwerk_core::config::OcrwerkConfig;
use ocrwerk_core::error::{OcrwerkError, Result};
use ocrwerk_core::types::{ProgressUpdate, RunId, SourceKind};
use tracing::{info, info_span, instrument, warn};

use crate::image::processor::{ImageProcessor, looks_like_image};
use crate::image::raster::RasterImage;
use crate::pdf::render::{PageRenderer, PdfPageRasterizer};
use crate::progress::ProgressTracker;
use crate::scan::engine::{EngineLauncher, EngineOptions, EngineSession};
use crate::scan::enhance::PreprocessPipeline;
use crate::scan::fusion::ResultFusion;
use crate::scan::orchestrator::RecognitionOrchestrator;
use crate::text::sanitize::TextSanitizer;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Which page of a paged input to render, and at what scale.
#[derive(Debug, Clone, Copy)]
struct PageRequest {
    index: usize,
    scale: f32,
}

/// Classify raw input bytes by content.
pub fn detect_source_kind(data: &[u8]) -> Result<SourceKind> {
    if data.starts_with(PDF_MAGIC) {
        Ok(SourceKind::RenderedPage)
    } else if looks_like_image(data) {
        Ok(SourceKind::Image)
    } else {
        Err(OcrwerkError::UnsupportedInput(
            "input is neither a PDF nor a recognised image format".into(),
        ))
    }
}

/// Turns scanned documents into text.
///
/// Holds only configuration and collaborators; every call builds its own
/// buffers and engine, so nothing carries over between runs.
pub struct DocumentProcessor {
    config: OcrwerkConfig,
    launcher: Box<dyn EngineLauncher>,
    renderer: Box<dyn PageRenderer>,
    orchestrator: RecognitionOrchestrator,
    fusion: ResultFusion,
    sanitizer: TextSanitizer,
}

impl DocumentProcessor {
    /// Validate `config` and build a processor using the scanned-PDF
    /// rasterizer for rendered pages.
    pub fn new(config: OcrwerkConfig, launcher: Box<dyn EngineLauncher>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            orchestrator: RecognitionOrchestrator::from_config(&config.recognition),
            fusion: ResultFusion::new(config.target_script.clone()),
            sanitizer: TextSanitizer::new(&config.sanitizer, config.target_script.clone())?,
            renderer: Box::new(PdfPageRasterizer::new()),
            launcher,
            config,
        })
    }

    /// Swap in another page renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn PageRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn config(&self) -> &OcrwerkConfig {
        &self.config
    }

    /// Number of pages in a paged document.
    pub fn page_count(&self, document: &[u8]) -> Result<usize> {
        self.renderer.page_count(document)
    }

    /// Extract text from one input. Rendered pages use the configured page
    /// index.
    ///
    /// Emits `(percent, label)` updates through `progress`. A cancelled run
    /// returns `OcrwerkError::Cancelled` and never partial text.
    pub fn process_document(
        &self,
        input: &[u8],
        source: SourceKind,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<String> {
        let page = PageRequest {
            index: self.config.render.page_index,
            scale: self.config.render.scale,
        };
        self.run(input, source, page, cancel, progress)
    }

    /// Extract text from one page of a paged document.
    pub fn process_page(
        &self,
        document: &[u8],
        page_index: usize,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<String> {
        let page = PageRequest {
            index: page_index,
            scale: self.config.render.scale,
        };
        self.run(document, SourceKind::RenderedPage, page, cancel, progress)
    }

    /// Extract every page of a paged document as independent runs, joining
    /// page texts with a blank line. Pages are rendered at
    /// `render.all_pages_scale`.
    ///
    /// A page with no recognisable text is skipped; the call fails with
    /// `NoResult` only when every page comes back empty.
    #[instrument(skip_all, fields(bytes_len = document.len()))]
    pub fn process_all_pages(
        &self,
        document: &[u8],
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<String> {
        if !document.starts_with(PDF_MAGIC) {
            return Err(OcrwerkError::UnsupportedInput(
                "only PDF documents have pages".into(),
            ));
        }
        let pages = self.page_count(document)?;
        info!(pages, "Processing all pages");

        let mut texts = Vec::with_capacity(pages);
        for page_index in 0..pages {
            cancel.check()?;
            let mut page_progress = |update: ProgressUpdate| {
                let overall = (page_index * 100 + usize::from(update.percent)) / pages.max(1);
                progress(ProgressUpdate {
                    percent: overall.min(100) as u8,
                    label: format!("Page {} of {pages}: {}", page_index + 1, update.label),
                });
            };
            let page = PageRequest {
                index: page_index,
                scale: self.config.render.all_pages_scale,
            };
            match self.run(
                document,
                SourceKind::RenderedPage,
                page,
                cancel,
                &mut page_progress,
            ) {
                Ok(text) if text.is_empty() => {}
                Ok(text) => texts.push(text),
                Err(OcrwerkError::NoResult) => {
                    warn!(page = page_index + 1, "No text on page, skipping");
                }
                Err(err) => return Err(err),
            }
        }

        if texts.is_empty() {
            return Err(OcrwerkError::NoResult);
        }
        Ok(texts.join("\n\n"))
    }

    fn run(
        &self,
        input: &[u8],
        source: SourceKind,
        page: PageRequest,
        cancel: &CancellationToken,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> Result<String> {
        let run_id = RunId::new();
        let span = info_span!("run", %run_id, ?source, bytes_len = input.len());
        let _entered = span.enter();

        let mut progress = ProgressTracker::new(progress);
        let result = self.run_stages(input, source, page, cancel, &mut progress);
        match &result {
            Ok(text) => info!(chars = text.chars().count(), "Run complete"),
            Err(err) if err.is_cancelled() => info!("Run cancelled"),
            Err(err) => warn!(kind = %err.kind(), %err, "Run failed"),
        }
        result
    }

    fn run_stages(
        &self,
        input: &[u8],
        source: SourceKind,
        page: PageRequest,
        cancel: &CancellationToken,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<String> {
        cancel.check()?;
        let raster = self.load(input, source, page, progress)?;
        cancel.check()?;

        progress.report(10, "Preparing image");
        let pipeline = PreprocessPipeline::new(*self.config.pipeline_for(source));
        let conditioned = pipeline.run(raster);
        cancel.check()?;
        progress.report(20, "Starting recognition engine");

        let options = EngineOptions {
            languages: self.config.recognition.languages.clone(),
            model: self.config.recognition.model,
        };
        let session = EngineSession::start(self.launcher.as_ref(), options)?;
        let candidates = self
            .orchestrator
            .run(session, &conditioned, cancel, progress)?;
        drop(conditioned);

        progress.report(85, "Choosing the best result");
        let best = self
            .fusion
            .select(&candidates)
            .ok_or(OcrwerkError::NoResult)?;
        info!(mode = %best.mode, confidence = best.confidence, "Candidate selected");
        cancel.check()?;

        progress.report(90, "Cleaning up text");
        let text = self.sanitizer.sanitize(&best.text);
        cancel.check()?;

        progress.report(100, "Done");
        Ok(text)
    }

    fn load(
        &self,
        input: &[u8],
        source: SourceKind,
        page: PageRequest,
        progress: &mut ProgressTracker<'_>,
    ) -> Result<RasterImage> {
        match source {
            SourceKind::Image => {
                progress.report(0, "Decoding image");
                Ok(ImageProcessor::from_bytes(input)?.into_raster())
            }
            SourceKind::RenderedPage => {
                if !input.starts_with(PDF_MAGIC) {
                    return Err(OcrwerkError::UnsupportedInput(
                        "expected a PDF document for page rendering".into(),
                    ));
                }
                progress.report(0, format!("Rendering page {}", page.index + 1));
                self.renderer.render_page(input, page.index, page.scale)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::tests::single_image_pdf;
    use crate::scan::engine::testing::{Reply, ScriptedLauncher, SharedLog};
    use image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    fn png_page() -> Vec<u8> {
        let page = RgbaImage::from_fn(32, 24, |x, y| {
            if (8..24).contains(&x) && y % 6 == 0 {
                Rgba([20, 20, 20, 255])
            } else {
                Rgba([235, 235, 235, 255])
            }
        });
        ImageProcessor::from_raster(page).to_png_bytes().unwrap()
    }

    fn processor_with(launcher: ScriptedLauncher) -> (DocumentProcessor, SharedLog) {
        let log = Arc::clone(&launcher.log);
        let processor =
            DocumentProcessor::new(OcrwerkConfig::default(), Box::new(launcher)).unwrap();
        (processor, log)
    }

    fn process(
        processor: &DocumentProcessor,
        input: &[u8],
        source: SourceKind,
        cancel: &CancellationToken,
    ) -> (Result<String>, Vec<ProgressUpdate>) {
        let mut updates = Vec::new();
        let mut sink = |update: ProgressUpdate| updates.push(update);
        let result = processor.process_document(input, source, cancel, &mut sink);
        (result, updates)
    }

    /// A renderer serving blank pages without parsing anything. Records the
    /// scale of every render.
    struct BlankPages {
        pages: usize,
        scales: Arc<Mutex<Vec<f32>>>,
    }

    impl BlankPages {
        fn new(pages: usize) -> (Self, Arc<Mutex<Vec<f32>>>) {
            let scales = Arc::new(Mutex::new(Vec::new()));
            let renderer = Self {
                pages,
                scales: Arc::clone(&scales),
            };
            (renderer, scales)
        }
    }

    impl PageRenderer for BlankPages {
        fn page_count(&self, _document: &[u8]) -> Result<usize> {
            Ok(self.pages)
        }

        fn render_page(&self, _document: &[u8], page_index: usize, scale: f32) -> Result<RasterImage> {
            self.scales.lock().unwrap().push(scale);
            if page_index >= self.pages {
                return Err(OcrwerkError::RenderFailure(format!(
                    "page {} out of range",
                    page_index + 1
                )));
            }
            Ok(RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255])))
        }
    }

    #[test]
    fn detects_source_kind_from_content() {
        assert_eq!(
            detect_source_kind(b"%PDF-1.7\n...").unwrap(),
            SourceKind::RenderedPage
        );
        assert_eq!(detect_source_kind(&png_page()).unwrap(), SourceKind::Image);
        assert!(matches!(
            detect_source_kind(b"hello"),
            Err(OcrwerkError::UnsupportedInput(_))
        ));
    }

    #[test]
    fn image_run_returns_sanitized_best_candidate() {
        let (processor, log) = processor_with(ScriptedLauncher::new(vec![
            Reply::Text("Hello   world...\n123456789012345", 85.0),
            Reply::Text("Hello", 40.0),
            Reply::Fail,
        ]));
        let (result, updates) = process(
            &processor,
            &png_page(),
            SourceKind::Image,
            &CancellationToken::new(),
        );

        assert_eq!(result.unwrap(), "Hello world.");
        let log = log.lock().unwrap();
        assert_eq!(log.calls.len(), 3);
        assert_eq!(log.launches, 1);
        assert_eq!(log.releases, 1);

        let percents: Vec<u8> = updates.iter().map(|u| u.percent).collect();
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
        assert_eq!(percents.first(), Some(&0));
        assert_eq!(percents.last(), Some(&100));
    }

    #[test]
    fn undecodable_image_is_unsupported_and_never_starts_engine() {
        let (processor, log) = processor_with(ScriptedLauncher::new(vec![]));
        let (result, _) = process(
            &processor,
            b"not an image",
            SourceKind::Image,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(OcrwerkError::UnsupportedInput(_))));
        assert_eq!(log.lock().unwrap().launches, 0);
    }

    #[test]
    fn page_source_must_be_a_pdf() {
        let (processor, _) = processor_with(ScriptedLauncher::new(vec![]));
        let (result, _) = process(
            &processor,
            &png_page(),
            SourceKind::RenderedPage,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(OcrwerkError::UnsupportedInput(_))));
    }

    #[test]
    fn all_empty_passes_report_no_result_after_one_fallback() {
        let (processor, log) = processor_with(ScriptedLauncher::new(vec![
            Reply::Text("", 0.0),
            Reply::Text("", 0.0),
            Reply::Text("", 0.0),
            Reply::Text("", 0.0),
        ]));
        let (result, _) = process(
            &processor,
            &png_page(),
            SourceKind::Image,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(OcrwerkError::NoResult)));
        let log = log.lock().unwrap();
        assert_eq!(log.calls.len(), 4);
        assert_eq!(log.releases, 1);
    }

    #[test]
    fn cancellation_mid_run_returns_no_text() {
        let cancel = CancellationToken::new();
        let mut launcher = ScriptedLauncher::new(vec![
            Reply::Text("one", 80.0),
            Reply::Text("two", 80.0),
            Reply::Text("three", 80.0),
        ]);
        launcher.cancel_on_call = Some((2, cancel.clone()));
        let (processor, log) = processor_with(launcher);

        let (result, updates) = process(&processor, &png_page(), SourceKind::Image, &cancel);
        assert!(matches!(result, Err(OcrwerkError::Cancelled)));
        let log = log.lock().unwrap();
        assert_eq!(log.calls.len(), 2);
        assert_eq!(log.releases, 1);
        assert!(updates.iter().all(|u| u.percent < 100));
    }

    #[test]
    fn engine_start_failure_surfaces() {
        let mut launcher = ScriptedLauncher::new(vec![]);
        launcher.fail_launch = true;
        let (processor, _) = processor_with(launcher);
        let (result, _) = process(
            &processor,
            &png_page(),
            SourceKind::Image,
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(OcrwerkError::EngineInitFailure(_))));
    }

    #[test]
    fn rendered_pdf_page_is_recognized() {
        let pixels: Vec<u8> = (0..10 * 10).flat_map(|_| [240u8, 240, 240]).collect();
        let pdf = single_image_pdf((10, 10), (10, 10), pixels);
        let (processor, _) = processor_with(ScriptedLauncher::new(vec![Reply::Text(
            "หน้าแรก page one",
            75.0,
        )]));
        let (result, _) = process(
            &processor,
            &pdf,
            SourceKind::RenderedPage,
            &CancellationToken::new(),
        );
        assert_eq!(result.unwrap(), "หน้าแรก page one");
    }

    #[test]
    fn all_pages_are_independent_runs() {
        let (processor, log) = processor_with(ScriptedLauncher::new(vec![Reply::Text(
            "page text",
            70.0,
        )]));
        let (renderer, scales) = BlankPages::new(2);
        let processor = processor.with_renderer(Box::new(renderer));

        let mut percents = Vec::new();
        let mut sink = |update: ProgressUpdate| percents.push(update.percent);
        let text = processor
            .process_all_pages(b"%PDF-1.5", &CancellationToken::new(), &mut sink)
            .unwrap();

        assert_eq!(text, "page text\n\npage text");
        assert_eq!(*scales.lock().unwrap(), vec![2.0, 2.0], "all-pages scale");
        let log = log.lock().unwrap();
        assert_eq!(log.launches, 2);
        assert_eq!(log.releases, 2);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
        assert_eq!(percents.last(), Some(&100));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = OcrwerkConfig::default();
        config.recognition.modes.clear();
        let result = DocumentProcessor::new(config, Box::new(ScriptedLauncher::new(vec![])));
        assert!(matches!(result, Err(OcrwerkError::InvalidConfig(_))));
    }

    #[test]
    fn single_page_renders_at_full_scale() {
        let (processor, _) = processor_with(ScriptedLauncher::new(vec![Reply::Text(
            "page text",
            70.0,
        )]));
        let (renderer, scales) = BlankPages::new(3);
        let processor = processor.with_renderer(Box::new(renderer));

        let text = processor
            .process_page(b"%PDF-1.5", 1, &CancellationToken::new(), &mut |_: ProgressUpdate| {})
            .unwrap();
        assert_eq!(text, "page text");
        assert_eq!(*scales.lock().unwrap(), vec![4.0]);
    }
}
