// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module: the RGBA raster type, per-pixel and neighbourhood operations,
// and decode/resize/encode helpers.

pub mod ops;
pub mod processor;
pub mod raster;

pub use processor::ImageProcessor;
pub use raster::{RasterImage, luminance, raster_from_rgba};
