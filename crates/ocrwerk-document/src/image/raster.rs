// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The RGBA raster every pipeline stage consumes and produces.

use image::{Rgba, RgbaImage};
use ocrwerk_core::error::{OcrwerkError, Result};

/// A contiguous 8-bit RGBA buffer, `width * height * 4` bytes.
///
/// Stages take one by value and hand back one of the same shape, so a buffer
/// is only ever owned by the stage currently working on it.
pub type RasterImage = RgbaImage;

/// Wrap raw RGBA bytes, checking `pixels.len() == width * height * 4`.
pub fn raster_from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<RasterImage> {
    let expected = width as usize * height as usize * 4;
    let actual = pixels.len();
    RgbaImage::from_raw(width, height, pixels).ok_or_else(|| {
        OcrwerkError::ImageError(format!(
            "{width}x{height} RGBA raster needs {expected} bytes, got {actual}"
        ))
    })
}

/// ITU-R BT.601 luma, unrounded.
pub fn luminance(pixel: &Rgba<u8>) -> f32 {
    let [r, g, b, _] = pixel.0;
    0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b)
}

/// Round to the nearest integer and clamp into a channel value.
pub(crate) fn to_channel(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
