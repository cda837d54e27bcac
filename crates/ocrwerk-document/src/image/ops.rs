// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel operations: contrast/brightness, grayscale, sharpen, Otsu
// binarization, median denoise, rule-line removal, and dilation.
//
// Every operation consumes a `RasterImage` and returns one of identical
// dimensions. Neighbourhood operations read from the unmodified input and
// leave the one-pixel frame untouched. Alpha is never modified.

use image::imageops::{self, FilterType};
use ocrwerk_core::config::{BorderRemovalConfig, MAX_RASTER_PIXELS};
use tracing::{debug, warn};

use super::raster::{RasterImage, luminance, to_channel};

// -- Tone -------------------------------------------------------------------

/// Multiplier applied around mid-gray for a contrast setting.
///
/// `contrast` is centred on 1.0 (unchanged) and clamped to `[0, 2]`; the
/// classic `259(C+255) / 255(259-C)` curve is evaluated at
/// `C = (contrast - 1) * 255`.
pub fn contrast_factor(contrast: f32) -> f32 {
    let contrast = if contrast.is_finite() {
        contrast.clamp(0.0, 2.0)
    } else {
        1.0
    };
    let c = (contrast - 1.0) * 255.0;
    259.0 * (c + 255.0) / (255.0 * (259.0 - c))
}

/// `out = clamp(factor * (in - 128) + 128 + brightness)` on R, G, B.
pub fn adjust_contrast_brightness(
    mut image: RasterImage,
    contrast: f32,
    brightness: f32,
) -> RasterImage {
    let factor = contrast_factor(contrast);
    let brightness = if brightness.is_finite() { brightness } else { 0.0 };
    debug!(factor, brightness, "Contrast/brightness");

    for pixel in image.pixels_mut() {
        for channel in &mut pixel.0[..3] {
            *channel = to_channel(factor * (f32::from(*channel) - 128.0) + 128.0 + brightness);
        }
    }
    image
}

/// Replace R, G, B with BT.601 luma.
pub fn grayscale(mut image: RasterImage) -> RasterImage {
    for pixel in image.pixels_mut() {
        let gray = to_channel(luminance(pixel));
        pixel.0[0] = gray;
        pixel.0[1] = gray;
        pixel.0[2] = gray;
    }
    image
}

// -- Neighbourhood filters --------------------------------------------------

/// 3x3 cross-shaped sharpen with kernel
/// `[[0,-k,0],[-k,5+2k,-k],[0,-k,0]]`, interior pixels only.
pub fn sharpen(image: RasterImage, intensity: f32) -> RasterImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image;
    }

    let k = intensity;
    let kernel = [[0.0, -k, 0.0], [-k, 5.0 + 2.0 * k, -k], [0.0, -k, 0.0]];
    let mut output = image.clone();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut acc = [0.0f32; 3];
            for (ky, row) in kernel.iter().enumerate() {
                for (kx, &weight) in row.iter().enumerate() {
                    if weight == 0.0 {
                        continue;
                    }
                    let neighbour = image.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for (sum, &value) in acc.iter_mut().zip(&neighbour.0[..3]) {
                        *sum += weight * f32::from(value);
                    }
                }
            }
            let target = output.get_pixel_mut(x, y);
            for (channel, sum) in target.0[..3].iter_mut().zip(acc) {
                *channel = to_channel(sum);
            }
        }
    }

    output
}

/// 3x3 median of the R channel, written to R, G and B.
///
/// Expects a grayscale image, where R stands for all three channels.
pub fn median_denoise(image: RasterImage) -> RasterImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image;
    }

    let mut output = image.clone();
    let mut window = [0u8; 9];

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut i = 0;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    window[i] = image.get_pixel(nx, ny).0[0];
                    i += 1;
                }
            }
            window.sort_unstable();
            let median = window[4];
            let target = output.get_pixel_mut(x, y);
            target.0[0] = median;
            target.0[1] = median;
            target.0[2] = median;
        }
    }

    output
}

/// Iterated 3x3 max filter per channel. Each pass reads the previous pass's
/// output.
pub fn dilate(image: RasterImage, iterations: u32) -> RasterImage {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return image;
    }

    let mut current = image;
    for _ in 0..iterations {
        current = dilate_once(&current);
    }
    current
}

fn dilate_once(source: &RasterImage) -> RasterImage {
    let (width, height) = source.dimensions();
    let mut output = source.clone();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let mut max = [0u8; 3];
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    let neighbour = source.get_pixel(nx, ny);
                    for (m, &value) in max.iter_mut().zip(&neighbour.0[..3]) {
                        *m = (*m).max(value);
                    }
                }
            }
            output.get_pixel_mut(x, y).0[..3].copy_from_slice(&max);
        }
    }

    output
}

// -- Thresholding -----------------------------------------------------------

fn luma_bin(pixel: &image::Rgba<u8>) -> usize {
    usize::from(to_channel(luminance(pixel)))
}

/// Compute the Otsu threshold over the rounded-luma histogram.
///
/// Maximises between-class variance `wB * wF * (mB - mF)^2`. Scans
/// ascending and only moves on a strictly greater variance, so the first
/// maximising threshold wins. A single-valued image yields 0.
pub fn otsu_threshold(image: &RasterImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[luma_bin(pixel)] += 1;
    }

    let total_pixels = u64::from(image.width()) * u64::from(image.height());
    if total_pixels == 0 {
        return 0;
    }

    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut sum_background: f64 = 0.0;
    let mut weight_background: u64 = 0;
    let mut max_variance: f64 = 0.0;
    let mut best_threshold: u8 = 0;

    for (t, &count) in histogram.iter().enumerate() {
        weight_background += count;
        if weight_background == 0 {
            continue;
        }
        let weight_foreground = total_pixels - weight_background;
        if weight_foreground == 0 {
            break;
        }

        sum_background += t as f64 * count as f64;
        let mean_background = sum_background / weight_background as f64;
        let mean_foreground = (sum_total - sum_background) / weight_foreground as f64;

        let between_variance = weight_background as f64
            * weight_foreground as f64
            * (mean_background - mean_foreground).powi(2);

        if between_variance > max_variance {
            max_variance = between_variance;
            best_threshold = t as u8;
        }
    }

    best_threshold
}

/// Global Otsu binarization: luma above the threshold becomes white, the
/// rest black.
pub fn binarize_otsu(mut image: RasterImage) -> RasterImage {
    let threshold = otsu_threshold(&image);
    debug!(threshold, "Otsu threshold computed");

    for pixel in image.pixels_mut() {
        let value = if luma_bin(pixel) > usize::from(threshold) {
            255
        } else {
            0
        };
        pixel.0[0] = value;
        pixel.0[1] = value;
        pixel.0[2] = value;
    }
    image
}

// -- Rule lines -------------------------------------------------------------

/// Whiten full-length dark columns and rows (scanner borders, table rules).
///
/// Detection finishes on both axes before anything is erased, so erasing a
/// column can never change what the row scan sees.
pub fn remove_borders(mut image: RasterImage, config: &BorderRemovalConfig) -> RasterImage {
    let (width, height) = image.dimensions();

    let columns: Vec<u32> = (0..width)
        .filter(|&x| {
            is_rule_line(
                (0..height).map(|y| luminance(image.get_pixel(x, y))),
                height,
                config,
            )
        })
        .collect();
    let rows: Vec<u32> = (0..height)
        .filter(|&y| {
            is_rule_line(
                (0..width).map(|x| luminance(image.get_pixel(x, y))),
                width,
                config,
            )
        })
        .collect();

    debug!(columns = columns.len(), rows = rows.len(), "Rule lines marked");

    for &x in &columns {
        for y in 0..height {
            image.get_pixel_mut(x, y).0[..3].copy_from_slice(&[255, 255, 255]);
        }
    }
    for &y in &rows {
        for x in 0..width {
            image.get_pixel_mut(x, y).0[..3].copy_from_slice(&[255, 255, 255]);
        }
    }

    image
}

/// A line qualifies when its longest dark run and its total dark count both
/// exceed their fraction of the axis length.
fn is_rule_line(
    luminances: impl Iterator<Item = f32>,
    length: u32,
    config: &BorderRemovalConfig,
) -> bool {
    let mut run = 0u32;
    let mut longest = 0u32;
    let mut total = 0u32;

    for lum in luminances {
        if lum < config.dark_threshold {
            run += 1;
            total += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }

    let length = length as f32;
    longest as f32 > length * config.min_run_ratio
        && total as f32 > length * config.min_coverage_ratio
}

// -- Geometry ---------------------------------------------------------------

/// Non-smoothed resize by `factor`; new sides are `max(1, floor(side * factor))`.
///
/// A factor of 1, one that is not a positive finite number, or one whose
/// result would exceed [`MAX_RASTER_PIXELS`] returns the input unchanged.
pub fn scale_nearest(image: RasterImage, factor: f32) -> RasterImage {
    if !factor.is_finite() || factor <= 0.0 {
        warn!(factor, "Ignoring invalid pre-scale factor");
        return image;
    }
    if factor == 1.0 {
        return image;
    }

    let (width, height) = image.dimensions();
    let scaled_width = (f64::from(width) * f64::from(factor)).floor().max(1.0);
    let scaled_height = (f64::from(height) * f64::from(factor)).floor().max(1.0);
    if scaled_width * scaled_height > MAX_RASTER_PIXELS as f64 {
        warn!(
            factor,
            width, height, "Ignoring pre-scale factor, result would be too large"
        );
        return image;
    }
    let new_width = scaled_width as u32;
    let new_height = scaled_height as u32;
    debug!(width, height, new_width, new_height, "Nearest-neighbour pre-scale");

    imageops::resize(&image, new_width, new_height, FilterType::Nearest)
}

// -- Tests ------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn gray(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255]))
    }

    #[test]
    fn unit_contrast_zero_brightness_is_identity() {
        let img = RgbaImage::from_fn(16, 16, |x, y| {
            Rgba([(x * 16) as u8, (y * 16) as u8, ((x + y) * 7) as u8, 200])
        });
        let out = adjust_contrast_brightness(img.clone(), 1.0, 0.0);
        assert_eq!(out, img);
        assert_eq!(contrast_factor(1.0), 1.0);
    }

    #[test]
    fn contrast_spreads_around_mid_gray() {
        let img = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                Rgba([100, 100, 100, 255])
            } else {
                Rgba([160, 160, 160, 255])
            }
        });
        let out = adjust_contrast_brightness(img, 1.3, 0.0);
        assert!(out.get_pixel(0, 0).0[0] < 100);
        assert!(out.get_pixel(1, 0).0[0] > 160);
    }

    #[test]
    fn brightness_offsets_and_clamps_but_keeps_alpha() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([250, 10, 128, 77]));
        let out = adjust_contrast_brightness(img, 1.0, 15.0);
        assert_eq!(out.get_pixel(1, 1).0, [255, 25, 143, 77]);
    }

    #[test]
    fn grayscale_equalises_channels() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
        let out = grayscale(img);
        let px = out.get_pixel(2, 2).0;
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[0], 76); // round(0.299 * 255)
    }

    #[test]
    fn sharpen_never_touches_the_frame() {
        let img = gray(6, 5, 40);
        let out = sharpen(img, 1.0);
        for x in 0..6 {
            assert_eq!(out.get_pixel(x, 0).0[0], 40);
            assert_eq!(out.get_pixel(x, 4).0[0], 40);
        }
        for y in 0..5 {
            assert_eq!(out.get_pixel(0, y).0[0], 40);
            assert_eq!(out.get_pixel(5, y).0[0], 40);
        }
        // Flat interior: (5 + 2k - 4k) * 40 = 120 for k = 1.
        assert_eq!(out.get_pixel(2, 2).0[0], 120);
    }

    #[test]
    fn sharpen_clamps_to_channel_range() {
        let mut img = gray(3, 3, 0);
        img.put_pixel(1, 1, Rgba([200, 200, 200, 255]));
        let out = sharpen(img, 1.5);
        assert_eq!(out.get_pixel(1, 1).0[0], 255);
    }

    #[test]
    fn tiny_images_pass_through_neighbourhood_filters() {
        let img = gray(2, 7, 90);
        assert_eq!(sharpen(img.clone(), 1.0), img);
        assert_eq!(median_denoise(img.clone()), img);
        assert_eq!(dilate(img.clone(), 3), img);
    }

    #[test]
    fn otsu_threshold_splits_bimodal_clusters() {
        // Dark cluster 50..=70 (mean 60), light cluster 180..=200 (mean 190).
        let img = RgbaImage::from_fn(42, 20, |x, y| {
            let offset = ((x + y) % 21) as u8;
            let v = if x < 21 { 50 + offset } else { 180 + offset };
            Rgba([v, v, v, 255])
        });
        let t = otsu_threshold(&img);
        assert!(t > 60 && t < 190, "threshold {t} should lie between 60 and 190");
    }

    #[test]
    fn otsu_ties_resolve_to_first_threshold() {
        // Two exact values: every t in 60..190 has the same variance.
        let img = RgbaImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgba([60, 60, 60, 255])
            } else {
                Rgba([190, 190, 190, 255])
            }
        });
        assert_eq!(otsu_threshold(&img), 60);
    }

    #[test]
    fn otsu_on_flat_image_is_zero() {
        assert_eq!(otsu_threshold(&gray(8, 8, 133)), 0);
    }

    #[test]
    fn binarize_produces_pure_black_and_white() {
        let img = RgbaImage::from_fn(20, 10, |x, _| {
            let v = if x < 10 { 40 + x as u8 } else { 200 + x as u8 };
            Rgba([v, v, v, 255])
        });
        let out = binarize_otsu(img);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(19, 9).0, [255, 255, 255, 255]);
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn median_removes_salt_noise() {
        let mut img = gray(5, 5, 30);
        img.put_pixel(2, 2, Rgba([255, 255, 255, 255]));
        let out = median_denoise(img);
        assert_eq!(out.get_pixel(2, 2).0, [30, 30, 30, 255]);
    }

    #[test]
    fn dilation_is_iterative() {
        let mut img = gray(9, 9, 0);
        img.put_pixel(4, 4, Rgba([255, 255, 255, 255]));

        let once = dilate(img.clone(), 1);
        assert_eq!(once.get_pixel(3, 3).0[0], 255);
        assert_eq!(once.get_pixel(2, 2).0[0], 0);

        let twice = dilate(img, 2);
        assert_eq!(twice.get_pixel(2, 2).0[0], 255);
        assert_eq!(twice.get_pixel(1, 1).0[0], 0);
    }

    #[test]
    fn dilation_works_per_channel() {
        let mut img = gray(5, 5, 0);
        img.put_pixel(1, 1, Rgba([200, 0, 0, 255]));
        img.put_pixel(3, 3, Rgba([0, 0, 90, 255]));
        let out = dilate(img, 1);
        assert_eq!(out.get_pixel(2, 2).0, [200, 0, 90, 255]);
    }

    #[test]
    fn border_removal_whitens_full_rules() {
        let mut img = gray(40, 30, 255);
        for y in 0..30 {
            img.put_pixel(3, y, Rgba([0, 0, 0, 255]));
        }
        for x in 0..40 {
            img.put_pixel(x, 25, Rgba([20, 20, 20, 255]));
        }
        // Text-like stroke crossing the vertical rule.
        for x in 5..15 {
            img.put_pixel(x, 10, Rgba([0, 0, 0, 255]));
        }

        let out = remove_borders(img, &BorderRemovalConfig::default());
        assert!((0..30).all(|y| out.get_pixel(3, y).0[0] == 255));
        assert!((0..40).all(|x| out.get_pixel(x, 25).0[0] == 255));
        assert_eq!(out.get_pixel(8, 10).0[0], 0, "text stroke must survive");
    }

    #[test]
    fn border_removal_leaves_short_lines_alone() {
        let mut img = gray(50, 40, 250);
        // Longest run 37/40 = 92.5%: under the 95% bar.
        for y in 0..37 {
            img.put_pixel(10, y, Rgba([0, 0, 0, 255]));
        }
        for x in 0..30 {
            img.put_pixel(x, 20, Rgba([0, 0, 0, 255]));
        }
        let out = remove_borders(img.clone(), &BorderRemovalConfig::default());
        assert_eq!(out, img);
    }

    #[test]
    fn scale_nearest_floors_dimensions() {
        let img = gray(10, 7, 12);
        let out = scale_nearest(img.clone(), 1.5);
        assert_eq!(out.dimensions(), (15, 10));
        assert_eq!(scale_nearest(img.clone(), 1.0), img);
        assert_eq!(scale_nearest(img.clone(), -2.0), img);
        assert_eq!(scale_nearest(img, 0.01).dimensions(), (1, 1));
    }

    #[test]
    fn oversized_pre_scale_is_ignored() {
        let img = gray(10, 7, 12);
        // 10x7 at 5000x would be 1.75e9 pixels.
        assert_eq!(scale_nearest(img.clone(), 5000.0), img);
        assert_eq!(scale_nearest(img, 100.0).dimensions(), (1000, 700));
    }
}
