// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rendering seam and the scanned-PDF rasterizer.

use ocrwerk_core::config::MAX_RASTER_PIXELS;
use ocrwerk_core::error::{OcrwerkError, Result};
use tracing::{info, instrument, warn};

use super::reader::PdfReader;
use crate::image::processor::ImageProcessor;
use crate::image::raster::RasterImage;

/// Turns one page of a paged document into pixels.
pub trait PageRenderer: Send + Sync {
    fn page_count(&self, document: &[u8]) -> Result<usize>;

    /// Render zero-based `page_index` at `scale` pixels per document unit.
    fn render_page(&self, document: &[u8], page_index: usize, scale: f32) -> Result<RasterImage>;
}

/// Rasterizes scanned PDF pages from their embedded images.
///
/// A scanned page is one large image XObject. That image is decoded and
/// resampled to `MediaBox x scale`; when the page size is unusable the image
/// keeps its native resolution. Pages with only vector content fail with
/// `RenderFailure`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPageRasterizer;

impl PdfPageRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl PageRenderer for PdfPageRasterizer {
    fn page_count(&self, document: &[u8]) -> Result<usize> {
        Ok(PdfReader::from_bytes(document)?.page_count())
    }

    #[instrument(skip(self, document), fields(bytes_len = document.len()))]
    fn render_page(&self, document: &[u8], page_index: usize, scale: f32) -> Result<RasterImage> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(OcrwerkError::RenderFailure(format!(
                "render scale must be positive, got {scale}"
            )));
        }

        let reader = PdfReader::from_bytes(document)?;
        let page = reader.largest_page_image(page_index)?;
        let processor = ImageProcessor::from_dynamic(page);

        let target = match reader.page_size(page_index) {
            Ok(size) => {
                let width = (f64::from(size.width) * f64::from(scale)).round();
                let height = (f64::from(size.height) * f64::from(scale)).round();
                if width * height > MAX_RASTER_PIXELS as f64 {
                    return Err(OcrwerkError::RenderFailure(format!(
                        "page {} at scale {scale} would be {width}x{height} pixels, over the {MAX_RASTER_PIXELS} pixel limit",
                        page_index + 1
                    )));
                }
                (width >= 1.0 && height >= 1.0).then_some((width as u32, height as u32))
            }
            Err(err) => {
                warn!(%err, "Keeping embedded image resolution");
                None
            }
        };

        let processor = match target {
            Some((width, height)) => processor.resize_exact(width, height),
            None => processor,
        };

        info!(
            page = page_index + 1,
            width = processor.width(),
            height = processor.height(),
            "Page rasterized"
        );
        Ok(processor.into_raster())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::reader::tests::single_image_pdf;

    fn gray_rgb(width: u32, height: u32) -> Vec<u8> {
        vec![128; (width * height * 3) as usize]
    }

    #[test]
    fn page_is_resampled_to_media_box_times_scale() {
        let pdf = single_image_pdf((20, 10), (7, 5), gray_rgb(7, 5));
        let raster = PdfPageRasterizer::new().render_page(&pdf, 0, 2.0).unwrap();
        assert_eq!(raster.dimensions(), (40, 20));
        assert_eq!(raster.get_pixel(10, 10).0[3], 255);
    }

    #[test]
    fn oversized_render_is_refused() {
        let pdf = single_image_pdf((20, 10), (2, 2), gray_rgb(2, 2));
        let result = PdfPageRasterizer::new().render_page(&pdf, 0, 10_000.0);
        match result {
            Err(OcrwerkError::RenderFailure(detail)) => assert!(detail.contains("pixel limit"), "{detail}"),
            other => panic!("expected a render failure, got {:?}", other.map(|r| r.dimensions())),
        }
    }

    #[test]
    fn page_count_reads_page_tree() {
        let pdf = single_image_pdf((20, 10), (2, 2), gray_rgb(2, 2));
        assert_eq!(PdfPageRasterizer::new().page_count(&pdf).unwrap(), 1);
    }

    #[test]
    fn missing_page_and_bad_scale_fail() {
        let pdf = single_image_pdf((20, 10), (2, 2), gray_rgb(2, 2));
        let renderer = PdfPageRasterizer::new();
        assert!(matches!(
            renderer.render_page(&pdf, 1, 1.0),
            Err(OcrwerkError::RenderFailure(_))
        ));
        assert!(matches!(
            renderer.render_page(&pdf, 0, 0.0),
            Err(OcrwerkError::RenderFailure(_))
        ));
    }
}
