// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: decode, resize, and encode in-memory images using the
// `image` crate. Bridges encoded bytes and the `RasterImage` the pipeline
// works on.

use image::{DynamicImage, ImageFormat};
use ocrwerk_core::error::OcrwerkError;
use tracing::{debug, info, instrument};

use super::raster::RasterImage;

/// Image processing wrapper around a single in-memory image.
///
/// Each method consumes `self` and returns a new `ImageProcessor`, enabling
/// method chaining:
///
/// ```ignore
/// let raster = ImageProcessor::from_bytes(&bytes)?
///     .resize_exact(2480, 3508)
///     .into_raster();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (PNG, JPEG, TIFF, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, OcrwerkError> {
        let img = image::load_from_memory(data).map_err(|err| {
            OcrwerkError::UnsupportedInput(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    /// Wrap a pipeline raster.
    pub fn from_raster(raster: RasterImage) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(raster),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Consume the processor and return an RGBA raster.
    pub fn into_raster(self) -> RasterImage {
        self.image.into_rgba8()
    }

    // -- Transformations ------------------------------------------------------

    /// Resize to exactly `width` x `height` with Lanczos3 filtering.
    #[instrument(skip(self), fields(width, height))]
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        if (width, height) == (self.image.width(), self.image.height()) {
            return self;
        }
        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            width,
            height,
            "Resizing image"
        );
        let resized = self.image.resize_exact(
            width.max(1),
            height.max(1),
            image::imageops::FilterType::Lanczos3,
        );
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, OcrwerkError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }
}

/// Whether `data` starts like an image format we can decode.
pub fn looks_like_image(data: &[u8]) -> bool {
    image::guess_format(data).is_ok()
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, OcrwerkError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| OcrwerkError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
