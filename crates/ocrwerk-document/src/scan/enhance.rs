// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan enhancement pipeline: conditions a raw raster for recognition by
// composing pixel operations in a fixed order under a named profile.

use ocrwerk_core::config::PipelineConfig;
use ocrwerk_core::types::Profile;
use tracing::{debug, info, instrument};

use crate::image::ops;
use crate::image::raster::RasterImage;

/// One conditioning step, in the order the pipeline applies them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    PreScale(f32),
    ContrastBrightness { contrast: f32, brightness: f32 },
    Grayscale,
    Denoise,
    Sharpen(f32),
    Binarize,
    Dilate(u32),
    RemoveBorders,
}

/// Ordered, profile-driven composition of pixel operations.
///
/// Stage order is fixed:
///
/// 1. pre-scale (nearest neighbour, before any pixel transform so later
///    ratios are measured on the scaled raster)
/// 2. contrast/brightness
/// 3. grayscale
/// 4. median denoise (Enhanced only)
/// 5. sharpen
/// 6. Otsu binarization (Enhanced only)
/// 7. dilation (Enhanced only)
/// 8. border/rule-line removal (own toggle, any profile)
///
/// Binarization and denoise help printed scans but can wreck text that was
/// rendered straight from a document at high resolution, so callers pick
/// the profile from the source's provenance.
#[derive(Debug, Clone)]
pub struct PreprocessPipeline {
    config: PipelineConfig,
}

impl PreprocessPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The stages `run` will apply, in order.
    pub fn plan(&self) -> Vec<Stage> {
        let config = &self.config;
        let enhanced = config.profile == Profile::Enhanced;
        let mut stages = Vec::with_capacity(8);

        if config.pre_scale != 1.0 {
            stages.push(Stage::PreScale(config.pre_scale));
        }
        stages.push(Stage::ContrastBrightness {
            contrast: config.contrast,
            brightness: config.brightness,
        });
        if config.grayscale {
            stages.push(Stage::Grayscale);
        }
        if enhanced && config.denoise {
            stages.push(Stage::Denoise);
        }
        if let Some(intensity) = config.sharpen {
            stages.push(Stage::Sharpen(intensity));
        }
        if enhanced && config.binarize {
            stages.push(Stage::Binarize);
        }
        if enhanced && config.dilate_iterations > 0 {
            stages.push(Stage::Dilate(config.dilate_iterations));
        }
        if config.remove_borders {
            stages.push(Stage::RemoveBorders);
        }

        stages
    }

    /// Condition `image` for recognition. Never fails.
    #[instrument(skip_all, fields(width = image.width(), height = image.height(), profile = ?self.config.profile))]
    pub fn run(&self, image: RasterImage) -> RasterImage {
        let plan = self.plan();
        info!(stages = plan.len(), "Running preprocessing pipeline");

        let mut image = image;
        for stage in plan {
            debug!(?stage, "Applying stage");
            image = self.apply(stage, image);
        }

        debug!(
            width = image.width(),
            height = image.height(),
            "Preprocessing complete"
        );
        image
    }

    fn apply(&self, stage: Stage, image: RasterImage) -> RasterImage {
        match stage {
            Stage::PreScale(factor) => ops::scale_nearest(image, factor),
            Stage::ContrastBrightness {
                contrast,
                brightness,
            } => ops::adjust_contrast_brightness(image, contrast, brightness),
            Stage::Grayscale => ops::grayscale(image),
            Stage::Denoise => ops::median_denoise(image),
            Stage::Sharpen(intensity) => ops::sharpen(image, intensity),
            Stage::Binarize => ops::binarize_otsu(image),
            Stage::Dilate(iterations) => ops::dilate(image, iterations),
            Stage::RemoveBorders => ops::remove_borders(image, &self.config.borders),
        }
    }
}

/// Run the pipeline once with `config`.
pub fn preprocess(image: RasterImage, config: &PipelineConfig) -> RasterImage {
    PreprocessPipeline::new(*config).run(image)
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    /// Columns of the full-height left rule; wide enough to survive the median.
    const RULE: std::ops::Range<u32> = 2..5;

    /// Light page with a dark text-ish block and a full-height left rule.
    fn synthetic_page(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let in_text = (10..width - 10).contains(&x) && (y / 4) % 3 == 0 && y > 8;
            if RULE.contains(&x) || in_text {
                Rgba([30, 30, 40, 255])
            } else {
                Rgba([225, 220, 210, 255])
            }
        })
    }

    #[test]
    fn standard_plan_skips_heavy_stages() {
        let mut config = PipelineConfig::standard();
        // Heavy toggles are ignored under the Standard profile.
        config.binarize = true;
        config.denoise = true;
        config.dilate_iterations = 2;

        let plan = PreprocessPipeline::new(config).plan();
        assert_eq!(
            plan,
            vec![
                Stage::ContrastBrightness {
                    contrast: 1.3,
                    brightness: 15.0
                },
                Stage::Grayscale,
                Stage::Sharpen(1.0),
            ]
        );
    }

    #[test]
    fn enhanced_plan_follows_fixed_order() {
        let mut config = PipelineConfig::enhanced();
        config.pre_scale = 2.0;
        config.dilate_iterations = 1;
        config.remove_borders = true;

        let plan = PreprocessPipeline::new(config).plan();
        assert_eq!(
            plan,
            vec![
                Stage::PreScale(2.0),
                Stage::ContrastBrightness {
                    contrast: 1.5,
                    brightness: 25.0
                },
                Stage::Grayscale,
                Stage::Denoise,
                Stage::Sharpen(1.5),
                Stage::Binarize,
                Stage::Dilate(1),
                Stage::RemoveBorders,
            ]
        );
    }

    #[test]
    fn border_removal_runs_under_standard_profile() {
        let mut config = PipelineConfig::standard();
        config.remove_borders = true;
        config.sharpen = None;
        let plan = PreprocessPipeline::new(config).plan();
        assert_eq!(plan.last(), Some(&Stage::RemoveBorders));
    }

    #[test]
    fn run_preserves_dimensions_without_pre_scale() {
        let page = synthetic_page(64, 48);
        let out = preprocess(page, &PipelineConfig::enhanced());
        assert_eq!(out.dimensions(), (64, 48));
        assert!(out.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn pre_scale_changes_dimensions_first() {
        let mut config = PipelineConfig::standard();
        config.pre_scale = 2.0;
        let out = preprocess(synthetic_page(30, 20), &config);
        assert_eq!(out.dimensions(), (60, 40));
    }

    #[test]
    fn neutral_config_is_identity() {
        let config = PipelineConfig {
            contrast: 1.0,
            brightness: 0.0,
            grayscale: false,
            sharpen: None,
            binarize: false,
            denoise: false,
            dilate_iterations: 0,
            remove_borders: false,
            pre_scale: 1.0,
            profile: Profile::Standard,
            borders: Default::default(),
        };
        let page = synthetic_page(40, 30);
        assert_eq!(preprocess(page.clone(), &config), page);
    }

    #[test]
    fn enhanced_with_border_removal_erases_left_rule() {
        let page = synthetic_page(64, 48);

        let kept = preprocess(page.clone(), &PipelineConfig::enhanced());
        assert!(
            RULE.clone().all(|x| (0..48).all(|y| kept.get_pixel(x, y).0[0] == 0)),
            "rule survives the enhanced stack when border removal is off"
        );

        let mut config = PipelineConfig::enhanced();
        config.remove_borders = true;
        let out = preprocess(page, &config);
        assert!(
            RULE.clone().all(|x| (0..48).all(|y| out.get_pixel(x, y).0[0] == 255)),
            "rule columns are whitened"
        );
        // Text rows are shorter than the run threshold and stay.
        assert_eq!(out.get_pixel(20, 12).0[0], 0);
    }
}
