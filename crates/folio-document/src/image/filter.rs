// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Neighbourhood filters over the working raster: 3x3 convolution, bilateral
// (edge-preserving) smoothing, and weighted blending with a binary mask.
//
// Border pixels are handled by reflect-101 (`gfedcb|abcdefgh|gfedcba`).

use image::{GrayImage, ImageBuffer, Pixel};

use super::raster::Raster;

/// Convolve every channel with a row-major 3x3 kernel, saturating to u8.
pub fn convolve3x3(raster: &Raster, kernel: &[f32; 9]) -> Raster {
    match raster {
        Raster::Gray(img) => Raster::Gray(convolve_buffer(img, kernel)),
        Raster::Color(img) => Raster::Color(convolve_buffer(img, kernel)),
    }
}

/// [`convolve3x3`] for a bare single-channel image.
pub fn convolve_gray(gray: &GrayImage, kernel: &[f32; 9]) -> GrayImage {
    convolve_buffer(gray, kernel)
}

/// Cross-shaped sharpening: `center` weight on the pixel itself, `side` on its
/// four cardinal neighbours, zero on the diagonals.
pub fn sharpen(raster: &Raster, center: f32, side: f32) -> Raster {
    let kernel = [0.0, side, 0.0, side, center, side, 0.0, side, 0.0];
    convolve3x3(raster, &kernel)
}

fn convolve_buffer<P>(img: &ImageBuffer<P, Vec<u8>>, kernel: &[f32; 9]) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = img.dimensions();
    let channels = P::CHANNEL_COUNT as usize;
    let src = img.as_raw();
    let mut out = ImageBuffer::<P, Vec<u8>>::new(w, h);
    let (wi, hi) = (w as i64, h as i64);

    for y in 0..hi {
        for x in 0..wi {
            for c in 0..channels {
                let mut acc = 0.0f32;
                for ky in 0..3i64 {
                    let sy = reflect101(y + ky - 1, hi);
                    for kx in 0..3i64 {
                        let weight = kernel[(ky * 3 + kx) as usize];
                        if weight == 0.0 {
                            continue;
                        }
                        let sx = reflect101(x + kx - 1, wi);
                        acc += weight * src[(sy * w as usize + sx) * channels + c] as f32;
                    }
                }
                out[(x as u32, y as u32)].channels_mut()[c] = saturate(acc);
            }
        }
    }

    out
}

/// Edge-preserving smoothing.
///
/// `diameter` sets the neighbourhood (radius `diameter / 2`, circular support).
/// Neighbour weights combine a spatial Gaussian (`sigma_space`) with a colour
/// Gaussian (`sigma_color`) over the L1 distance across all channels, so pixels
/// across a strong edge contribute almost nothing.
pub fn bilateral(raster: &Raster, diameter: u32, sigma_color: f32, sigma_space: f32) -> Raster {
    match raster {
        Raster::Gray(img) => Raster::Gray(bilateral_buffer(img, diameter, sigma_color, sigma_space)),
        Raster::Color(img) => {
            Raster::Color(bilateral_buffer(img, diameter, sigma_color, sigma_space))
        }
    }
}

fn bilateral_buffer<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    diameter: u32,
    sigma_color: f32,
    sigma_space: f32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (w, h) = img.dimensions();
    let channels = P::CHANNEL_COUNT as usize;
    let radius = (diameter.max(1) / 2) as i64;
    let sigma_color = if sigma_color <= 0.0 { 1.0 } else { sigma_color };
    let sigma_space = if sigma_space <= 0.0 { 1.0 } else { sigma_space };
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    // Precompute the circular spatial window.
    let mut window: Vec<(i64, i64, f32)> = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2.sqrt() > radius as f32 {
                continue;
            }
            window.push((dx, dy, (r2 * space_coeff).exp()));
        }
    }

    // Colour weights indexed by L1 distance (0..=255 * channels).
    let max_dist = 255 * channels;
    let color_weights: Vec<f32> = (0..=max_dist)
        .map(|d| ((d * d) as f32 * color_coeff).exp())
        .collect();

    let src = img.as_raw();
    let (wi, hi) = (w as i64, h as i64);
    let mut out = ImageBuffer::<P, Vec<u8>>::new(w, h);
    let mut sums = vec![0.0f32; channels];

    for y in 0..hi {
        for x in 0..wi {
            let center = (y as usize * w as usize + x as usize) * channels;
            sums.iter_mut().for_each(|s| *s = 0.0);
            let mut weight_sum = 0.0f32;

            for &(dx, dy, space_weight) in &window {
                let sx = reflect101(x + dx, wi);
                let sy = reflect101(y + dy, hi);
                let idx = (sy * w as usize + sx) * channels;

                let dist: usize = (0..channels)
                    .map(|c| (src[idx + c] as i32 - src[center + c] as i32).unsigned_abs() as usize)
                    .sum();
                let weight = space_weight * color_weights[dist];

                for c in 0..channels {
                    sums[c] += weight * src[idx + c] as f32;
                }
                weight_sum += weight;
            }

            let px = out[(x as u32, y as u32)].channels_mut();
            for c in 0..channels {
                px[c] = if weight_sum > 0.0 {
                    saturate(sums[c] / weight_sum)
                } else {
                    src[center + c]
                };
            }
        }
    }

    out
}

/// `saturate(photo * (1 - mask_weight) + mask * mask_weight)`, with the
/// single-channel mask broadcast across every channel of `photo`.
pub fn blend_mask(photo: &Raster, mask: &GrayImage, mask_weight: f32) -> Raster {
    let photo_weight = 1.0 - mask_weight;
    let mix = |p: u8, m: u8| saturate(p as f32 * photo_weight + m as f32 * mask_weight);

    match photo {
        Raster::Gray(img) => Raster::Gray(GrayImage::from_fn(img.width(), img.height(), |x, y| {
            image::Luma([mix(img.get_pixel(x, y).0[0], mask.get_pixel(x, y).0[0])])
        })),
        Raster::Color(img) => {
            let mut out = img.clone();
            for (x, y, px) in out.enumerate_pixels_mut() {
                let m = mask.get_pixel(x, y).0[0];
                for v in px.0.iter_mut() {
                    *v = mix(*v, m);
                }
            }
            Raster::Color(out)
        }
    }
}

/// Map an out-of-range coordinate back into `0..n` by mirror reflection that
/// does not repeat the edge pixel.
pub(crate) fn reflect101(i: i64, n: i64) -> usize {
    if n <= 1 {
        return 0;
    }
    let mut i = i;
    if i < 0 {
        i = -i;
    }
    if i >= n {
        i = 2 * n - 2 - i;
    }
    i.clamp(0, n - 1) as usize
}

fn saturate(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn reflect101_mirrors_without_repeating_edge() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(-2, 2), 0);
        assert_eq!(reflect101(3, 1), 0);
    }

    #[test]
    fn sharpen_leaves_flat_regions_alone() {
        // Kernel weights sum to 1, so a uniform image is a fixed point.
        let flat = Raster::Gray(GrayImage::from_pixel(6, 6, Luma([100u8])));
        assert_eq!(sharpen(&flat, 3.0, -0.5), flat);
    }

    #[test]
    fn sharpen_amplifies_an_isolated_dark_dot() {
        let mut img = GrayImage::from_pixel(5, 5, Luma([200u8]));
        img.put_pixel(2, 2, Luma([100u8]));
        let Raster::Gray(out) = sharpen(&Raster::Gray(img), 3.0, -0.5) else {
            panic!("layout changed");
        };
        // 3*100 - 4*0.5*200 = -100 -> 0
        assert_eq!(out.get_pixel(2, 2).0[0], 0);
        // 3*200 - 0.5*(100 + 3*200) = 250
        assert_eq!(out.get_pixel(2, 1).0[0], 250);
    }

    #[test]
    fn bilateral_preserves_uniform_color() {
        let img = Raster::Color(RgbImage::from_pixel(8, 8, Rgb([120, 60, 30])));
        assert_eq!(bilateral(&img, 5, 50.0, 50.0), img);
    }

    #[test]
    fn bilateral_keeps_hard_edges() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([0u8]) } else { Luma([255u8]) });
        let Raster::Gray(out) = bilateral(&Raster::Gray(img), 5, 50.0, 50.0) else {
            panic!("layout changed");
        };
        assert!(out.get_pixel(4, 5).0[0] < 5);
        assert!(out.get_pixel(5, 5).0[0] > 250);
    }

    #[test]
    fn bilateral_handles_single_pixel() {
        let img = Raster::Gray(GrayImage::from_pixel(1, 1, Luma([77u8])));
        assert_eq!(bilateral(&img, 5, 50.0, 50.0), img);
    }

    #[test]
    fn blend_mixes_seventy_thirty() {
        let photo = Raster::Color(RgbImage::from_pixel(2, 2, Rgb([100, 200, 0])));
        let mask = GrayImage::from_pixel(2, 2, Luma([250u8]));
        let Raster::Color(out) = blend_mask(&photo, &mask, 0.3) else {
            panic!("layout changed");
        };
        assert_eq!(out.get_pixel(1, 1).0, [145, 215, 75]);
    }
}
