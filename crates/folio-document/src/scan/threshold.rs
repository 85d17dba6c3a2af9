// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Binarization primitives — local (adaptive) thresholding, global Otsu
// thresholding, and mask combination.

use folio_core::config::AdaptiveMethod;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::filter::separable_filter_equal;

/// Foreground value of a binary mask.
pub const WHITE: u8 = 255;

/// Adaptive thresholding: a pixel becomes white when it is brighter than its
/// local reference level minus `c`, black otherwise.
///
/// `block_size` is the odd side length of the neighbourhood. The local level
/// is either a box mean (via a summed-area table) or a Gaussian-weighted mean
/// over a `block_size` x `block_size` window. Borders replicate the edge.
pub fn adaptive_threshold(gray: &GrayImage, block_size: u32, c: i32, method: AdaptiveMethod) -> GrayImage {
    let (width, height) = gray.dimensions();
    let radius = block_size / 2;

    let local: GrayImage = match method {
        AdaptiveMethod::Mean => {
            let integral = compute_integral_image(gray);
            GrayImage::from_fn(width, height, |x, y| {
                let mean = region_mean(&integral, width, height, x, y, radius);
                Luma([mean.round().clamp(0.0, 255.0) as u8])
            })
        }
        AdaptiveMethod::Gaussian => {
            let mean = gaussian_local_mean(gray, block_size);
            GrayImage::from_fn(width, height, |x, y| {
                Luma([mean.get_pixel(x, y).0[0].round().clamp(0.0, 255.0) as u8])
            })
        }
    };

    GrayImage::from_fn(width, height, |x, y| {
        let pixel = gray.get_pixel(x, y).0[0] as i32;
        let level = local.get_pixel(x, y).0[0] as i32;
        if pixel > level - c {
            Luma([WHITE])
        } else {
            Luma([0])
        }
    })
}

/// Sigma of the Gaussian window matching a kernel of side `block_size`.
fn block_sigma(block_size: u32) -> f32 {
    0.3 * ((block_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Normalised 1-D Gaussian with exactly `block_size` taps (rounded up to odd).
fn gaussian_kernel(block_size: u32) -> Vec<f32> {
    let taps = block_size.max(1) | 1;
    let sigma = block_sigma(taps);
    let centre = (taps / 2) as f32;
    let mut kernel: Vec<f32> = (0..taps)
        .map(|i| {
            let d = i as f32 - centre;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Gaussian-weighted local mean over a full `block_size` window, kept in
/// floating point between the two separable passes.
fn gaussian_local_mean(gray: &GrayImage, block_size: u32) -> ImageBuffer<Luma<f32>, Vec<f32>> {
    let (width, height) = gray.dimensions();
    let levels: ImageBuffer<Luma<f32>, Vec<f32>> =
        ImageBuffer::from_fn(width, height, |x, y| Luma([gray.get_pixel(x, y).0[0] as f32]));
    separable_filter_equal(&levels, &gaussian_kernel(block_size))
}

/// Binarize at a real-valued cut: strictly brighter pixels become white.
/// A negative cut makes everything white; a cut at or above 255 makes
/// everything black.
pub fn threshold_at(gray: &GrayImage, cut: f64) -> GrayImage {
    let mut out = gray.clone();
    for v in out.iter_mut() {
        *v = if *v as f64 > cut { WHITE } else { 0 };
    }
    out
}

/// Pixel-wise AND of two masks of equal dimensions.
pub fn mask_and(a: &GrayImage, b: &GrayImage) -> GrayImage {
    let mut out = a.clone();
    for (dst, src) in out.iter_mut().zip(b.iter()) {
        *dst &= *src;
    }
    out
}

// -- Integral image helpers ---------------------------------------------------

/// Compute the integral (summed-area table) of a grayscale image.
///
/// `integral[y * (width+1) + x]` contains the sum of all pixel values in the
/// rectangle [0, 0) to (x, y) (exclusive on both axes). The table has
/// dimensions `(width+1) x (height+1)` with a zero-padded border.
fn compute_integral_image(gray: &GrayImage) -> Vec<u64> {
    let (w, h) = gray.dimensions();
    let stride = (w + 1) as usize;
    let mut table = vec![0u64; stride * (h + 1) as usize];

    for y in 0..h {
        let mut row_sum: u64 = 0;
        for x in 0..w {
            row_sum += gray.get_pixel(x, y).0[0] as u64;
            let idx = (y + 1) as usize * stride + (x + 1) as usize;
            let above = y as usize * stride + (x + 1) as usize;
            table[idx] = row_sum + table[above];
        }
    }

    table
}

/// Mean pixel value within a square region centred on (cx, cy) with the
/// given radius, clamped to the image, using the precomputed integral image.
fn region_mean(integral: &[u64], img_width: u32, img_height: u32, cx: u32, cy: u32, radius: u32) -> f64 {
    let stride = (img_width + 1) as usize;

    let x1 = cx.saturating_sub(radius) as usize;
    let y1 = cy.saturating_sub(radius) as usize;
    let x2 = ((cx + radius + 1) as usize).min(img_width as usize);
    let y2 = ((cy + radius + 1) as usize).min(img_height as usize);

    let area = ((x2 - x1) * (y2 - y1)) as f64;
    if area == 0.0 {
        return 128.0;
    }

    // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
    let sum = integral[y2 * stride + x2] as f64 - integral[y1 * stride + x2] as f64
        - integral[y2 * stride + x1] as f64
        + integral[y1 * stride + x1] as f64;

    sum / area
}

/// Compute the Otsu threshold for a grayscale image.
///
/// Returns the level `t` maximising the between-class variance when the
/// background class is `<= t`. Uniform images yield 0.
pub fn otsu_threshold(gray: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in gray.pixels() {
        histogram[pixel.0[0] as usize] += 1;
    }

    let total_pixels = gray.width() as u64 * gray.height() as u64;
    if total_pixels == 0 {
        return 128;
    }

    let mut sum_total: f64 = 0.0;
    for (i, &count) in histogram.iter().enumerate() {
        sum_total += i as f64 * count as f64;
    }

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

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tone(width: u32, height: u32, dark: u8, light: u8) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| if x < width / 2 { Luma([dark]) } else { Luma([light]) })
    }

    #[test]
    fn otsu_splits_bimodal_histogram() {
        let gray = two_tone(20, 4, 40, 200);
        let t = otsu_threshold(&gray);
        assert!((40..200).contains(&t), "threshold {t} should separate 40 and 200");
    }

    #[test]
    fn otsu_uniform_image_is_zero() {
        let gray = GrayImage::from_pixel(5, 5, Luma([90u8]));
        assert_eq!(otsu_threshold(&gray), 0);
    }

    #[test]
    fn threshold_at_negative_cut_is_all_white() {
        let gray = GrayImage::from_pixel(3, 3, Luma([0u8]));
        assert!(threshold_at(&gray, -10.0).pixels().all(|p| p.0[0] == WHITE));
    }

    #[test]
    fn threshold_at_is_strict() {
        let gray = GrayImage::from_pixel(1, 1, Luma([100u8]));
        assert_eq!(threshold_at(&gray, 100.0).get_pixel(0, 0).0[0], 0);
        assert_eq!(threshold_at(&gray, 99.5).get_pixel(0, 0).0[0], WHITE);
    }

    #[test]
    fn mask_and_requires_agreement() {
        let a = two_tone(4, 1, 0, 255);
        let b = GrayImage::from_fn(4, 1, |x, _| if x % 2 == 0 { Luma([255u8]) } else { Luma([0u8]) });
        let out = mask_and(&a, &b);
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 0, 255, 0]);
    }

    #[test]
    fn adaptive_flat_page_is_white() {
        // Every pixel equals its local mean, and mean - 5 is below it.
        let gray = GrayImage::from_pixel(30, 30, Luma([180u8]));
        for method in [AdaptiveMethod::Mean, AdaptiveMethod::Gaussian] {
            let out = adaptive_threshold(&gray, 25, 5, method);
            assert!(out.pixels().all(|p| p.0[0] == WHITE));
        }
    }

    #[test]
    fn adaptive_marks_dark_stroke_black() {
        let mut gray = GrayImage::from_pixel(40, 40, Luma([220u8]));
        for y in 10..30 {
            gray.put_pixel(20, y, Luma([30u8]));
        }
        for method in [AdaptiveMethod::Mean, AdaptiveMethod::Gaussian] {
            let out = adaptive_threshold(&gray, 25, 5, method);
            assert_eq!(out.get_pixel(20, 20).0[0], 0);
            assert_eq!(out.get_pixel(5, 5).0[0], WHITE);
        }
    }

    #[test]
    fn gaussian_kernel_spans_the_whole_block() {
        let kernel = gaussian_kernel(25);
        assert_eq!(kernel.len(), 25);
        assert!((kernel.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!(kernel[0] > 0.0 && kernel[0] == kernel[24]);
        assert!(kernel[12] > kernel[11]);
        assert_eq!(gaussian_kernel(4).len(), 5);
    }

    /// A dark band 10 to 12 px away still lies inside a 25-px window and pulls
    /// the local level down; one 13 px away is outside it.
    #[test]
    fn gaussian_window_reaches_block_edge() {
        let banded = |start: u32| {
            GrayImage::from_fn(60, 60, |x, _| {
                if (start..start + 3).contains(&x) { Luma([0u8]) } else { Luma([200u8]) }
            })
        };

        let near = gaussian_local_mean(&banded(40), 25);
        let level = near.get_pixel(30, 30).0[0];
        assert!(level < 199.5 && level > 195.0, "level {level}");

        let far = gaussian_local_mean(&banded(43), 25);
        assert!((far.get_pixel(30, 30).0[0] - 200.0).abs() < 1e-2);

        // With c = -1 the pixel must beat level + 1: only the near band lowers
        // the level enough for the 200 pixel to stay white.
        let out = adaptive_threshold(&banded(40), 25, -1, AdaptiveMethod::Gaussian);
        assert_eq!(out.get_pixel(30, 30).0[0], WHITE);
        let out = adaptive_threshold(&banded(43), 25, -1, AdaptiveMethod::Gaussian);
        assert_eq!(out.get_pixel(30, 30).0[0], 0);
    }

    #[test]
    fn integral_mean_matches_direct_mean() {
        let gray = GrayImage::from_fn(6, 6, |x, y| Luma([(x * 10 + y) as u8]));
        let integral = compute_integral_image(&gray);
        let mean = region_mean(&integral, 6, 6, 0, 0, 1);
        // Pixels (0..2, 0..2): 0, 1, 10, 11
        assert!((mean - 5.5).abs() < 1e-9);
    }
}
