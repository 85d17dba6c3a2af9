// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print-legibility enhancement for a rectified page — contrast boost, dual
// binarization, luminance-only local contrast equalization, sharpening,
// edge-preserving smoothing, and a light blend of the binary mask.

use folio_core::config::EnhanceConfig;
use folio_core::error::{FolioError, Result};
use image::{DynamicImage, GrayImage};
use tracing::{debug, error, info, instrument};

use super::clahe::clahe;
use super::threshold::{adaptive_threshold, mask_and, otsu_threshold, threshold_at};
use crate::image::color::{lab_planes_to_rgb, rgb_to_lab_planes};
use crate::image::filter::{bilateral, blend_mask, convolve_gray, sharpen};
use crate::image::raster::{ColorLayout, Raster, scale_abs};

/// 3x3 binomial smoothing kernel.
const SMOOTH_KERNEL: [f32; 9] = [
    1.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
    2.0 / 16.0,
    4.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
    2.0 / 16.0,
    1.0 / 16.0,
];

/// Runs the enhancement pipeline on rectified pages.
///
/// Enhancement never fails from the caller's point of view: any internal
/// fault is logged and the untouched input is returned instead.
#[derive(Debug, Clone, Default)]
pub struct Enhancer {
    config: EnhanceConfig,
}

impl Enhancer {
    pub fn new(config: EnhanceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EnhanceConfig {
        &self.config
    }

    /// Enhance a decoded image, returning it in the same channel layout.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn enhance(&self, image: &DynamicImage) -> DynamicImage {
        let layout = ColorLayout::of(image);
        let raster = Raster::from_dynamic(image);
        match self.try_enhance(&raster) {
            Ok(enhanced) => enhanced.into_dynamic(layout),
            Err(err) => {
                error!(error = %err, "Enhancement failed; returning input unchanged");
                image.clone()
            }
        }
    }

    /// Enhance a raster already in the internal layout.
    pub fn enhance_raster(&self, raster: &Raster) -> Raster {
        match self.try_enhance(raster) {
            Ok(enhanced) => enhanced,
            Err(err) => {
                error!(error = %err, "Enhancement failed; returning input unchanged");
                raster.clone()
            }
        }
    }

    fn try_enhance(&self, raster: &Raster) -> Result<Raster> {
        let c = &self.config;
        if raster.is_empty() {
            return Err(FolioError::Internal(format!(
                "cannot enhance an empty {}x{} raster",
                raster.width(),
                raster.height()
            )));
        }
        if !(0.0..=1.0).contains(&c.mask_weight) {
            return Err(FolioError::Config(format!(
                "mask_weight must be within [0, 1], got {}",
                c.mask_weight
            )));
        }
        info!(
            width = raster.width(),
            height = raster.height(),
            channels = raster.channels(),
            "Running enhancement pipeline"
        );

        // Grayscale working copy: boost, then smooth away sensor noise.
        let boosted = scale_abs(&raster.to_gray(), c.contrast_gain, 0.0);
        let smoothed = convolve_gray(&boosted, &SMOOTH_KERNEL);

        let mask = self.binary_mask(&smoothed);

        let photometric = match raster {
            Raster::Color(rgb) => {
                let [l, a, b] = rgb_to_lab_planes(rgb);
                let l = clahe(&l, c.clahe_clip_limit, c.clahe_tiles);
                let l = scale_abs(&l, c.luminance_gain, c.luminance_bias);
                Raster::Color(lab_planes_to_rgb(&l, &a, &b))
            }
            Raster::Gray(_) => Raster::Gray(boosted),
        };

        let sharpened = sharpen(&photometric, c.sharpen_center, c.sharpen_side);
        let filtered = bilateral(
            &sharpened,
            c.bilateral_diameter,
            c.bilateral_sigma_color,
            c.bilateral_sigma_space,
        );

        Ok(blend_mask(&filtered, &mask, c.mask_weight))
    }

    /// AND of an adaptive and a slightly lowered Otsu binarization: a pixel
    /// stays white only when both agree it is background.
    fn binary_mask(&self, smoothed: &GrayImage) -> GrayImage {
        let c = &self.config;
        let adaptive = adaptive_threshold(
            smoothed,
            c.adaptive_block_size,
            c.adaptive_offset,
            c.adaptive_method,
        );

        let level = otsu_threshold(smoothed);
        let cut = level as f64 - c.otsu_offset;
        debug!(otsu = level, cut, "Global binarization level");
        let global = threshold_at(smoothed, cut);

        mask_and(&adaptive, &global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn page_with_stroke() -> GrayImage {
        let mut img = GrayImage::from_pixel(60, 60, Luma([230u8]));
        for y in 10..50 {
            for x in 20..23 {
                img.put_pixel(x, y, Luma([20u8]));
            }
        }
        img
    }

    /// A blank bright page saturates to pure white.
    #[test]
    fn blank_page_turns_white() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 30, Luma([230u8])));
        let out = Enhancer::default().enhance(&img);
        let gray = out.as_luma8().expect("layout preserved");
        assert!(gray.pixels().all(|p| p.0[0] == 255));
    }

    /// Dark strokes survive and stay dark; background goes white.
    #[test]
    fn strokes_stay_dark() {
        let img = DynamicImage::ImageLuma8(page_with_stroke());
        let out = Enhancer::default().enhance(&img);
        let gray = out.as_luma8().expect("layout preserved");
        assert!(gray.get_pixel(21, 30).0[0] < 60);
        assert_eq!(gray.get_pixel(50, 5).0[0], 255);
    }

    /// Colour inputs come back as colour with the same dimensions, and the
    /// chrominance is not flattened to gray.
    #[test]
    fn color_page_keeps_hue() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([200, 150, 100])));
        let out = Enhancer::default().enhance(&img);
        let rgb = out.as_rgb8().expect("layout preserved");
        assert_eq!(rgb.dimensions(), (64, 48));
        let px = rgb.get_pixel(32, 24).0;
        assert!(px[0] > px[2], "expected warm tone, got {px:?}");
    }

    #[test]
    fn rgba_layout_is_preserved() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(16, 16, Rgba([90, 90, 90, 128])));
        let out = Enhancer::default().enhance(&img);
        assert!(out.as_rgba8().is_some());
        assert_eq!((out.width(), out.height()), (16, 16));
    }

    #[test]
    fn single_pixel_does_not_fault() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, Rgb([10, 200, 30])));
        let out = Enhancer::default().enhance(&img);
        assert_eq!((out.width(), out.height()), (1, 1));
    }

    /// Internal faults fall back to an unmodified copy of the input.
    #[test]
    fn faults_return_input_unchanged() {
        let empty = Raster::Gray(GrayImage::new(0, 0));
        assert_eq!(Enhancer::default().enhance_raster(&empty), empty);

        let config = EnhanceConfig {
            mask_weight: 4.0,
            ..EnhanceConfig::default()
        };
        let page = Raster::Gray(page_with_stroke());
        assert_eq!(Enhancer::new(config).enhance_raster(&page), page);
    }

    #[test]
    fn mask_marks_only_the_stroke() {
        let mask = Enhancer::default().binary_mask(&page_with_stroke());
        assert_eq!(mask.get_pixel(21, 30).0[0], 0);
        assert_eq!(mask.get_pixel(5, 5).0[0], 255);
    }
}
