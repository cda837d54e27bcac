// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// ocrwerk-document: Scanned-document text extraction for OCR Werk.
//
// Provides raster conditioning (contrast, grayscale, sharpen, Otsu
// binarization, median denoise, dilation, border removal), multi-pass
// recognition against a pluggable engine, candidate fusion, text sanitizing,
// and scanned-PDF page rasterisation.

pub mod image;
pub mod pdf;
pub mod processor;
pub mod progress;
pub mod scan;
pub mod text;

// Re-export the primary structs so callers can use `ocrwerk_document::DocumentProcessor` etc.
pub use crate::image::processor::ImageProcessor;
pub use crate::image::raster::RasterImage;
pub use pdf::reader::PdfReader;
pub use pdf::render::{PageRenderer, PdfPageRasterizer};
pub use processor::{DocumentProcessor, detect_source_kind};
pub use scan::engine::{EngineLauncher, RecognitionEngine};
pub use scan::enhance::PreprocessPipeline;
pub use scan::tesseract::TesseractLauncher;
pub use text::sanitize::TextSanitizer;

#[cfg(feature = "ocr")]
pub use scan::ocr::OcrsLauncher;
