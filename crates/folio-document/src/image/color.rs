// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// sRGB <-> CIE L*a*b* (D65) conversion in the common 8-bit encoding:
// L* is scaled from 0..100 to 0..255, a* and b* are offset by 128.

use image::{GrayImage, Luma, Rgb, RgbImage};

/// D65 reference white.
const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;

/// CIE epsilon (216 / 24389).
const EPSILON: f32 = 0.008856;

/// Split an RGB image into its L*, a*, b* planes.
pub fn rgb_to_lab_planes(rgb: &RgbImage) -> [GrayImage; 3] {
    let (w, h) = rgb.dimensions();
    let lut = srgb_to_linear_table();
    let mut l_plane = GrayImage::new(w, h);
    let mut a_plane = GrayImage::new(w, h);
    let mut b_plane = GrayImage::new(w, h);

    for (x, y, px) in rgb.enumerate_pixels() {
        let [l, a, b] = rgb_to_lab_with(&lut, px.0);
        l_plane.put_pixel(x, y, Luma([l]));
        a_plane.put_pixel(x, y, Luma([a]));
        b_plane.put_pixel(x, y, Luma([b]));
    }

    [l_plane, a_plane, b_plane]
}

/// Merge L*, a*, b* planes back into an RGB image. All three planes must
/// share the same dimensions.
pub fn lab_planes_to_rgb(l_plane: &GrayImage, a_plane: &GrayImage, b_plane: &GrayImage) -> RgbImage {
    let (w, h) = l_plane.dimensions();
    RgbImage::from_fn(w, h, |x, y| {
        Rgb(lab_to_rgb([
            l_plane.get_pixel(x, y).0[0],
            a_plane.get_pixel(x, y).0[0],
            b_plane.get_pixel(x, y).0[0],
        ]))
    })
}

/// Convert one 8-bit sRGB pixel to 8-bit L*a*b*.
pub fn rgb_to_lab(rgb: [u8; 3]) -> [u8; 3] {
    rgb_to_lab_with(&srgb_to_linear_table(), rgb)
}

fn rgb_to_lab_with(lut: &[f32; 256], [r, g, b]: [u8; 3]) -> [u8; 3] {
    let (r, g, b) = (lut[r as usize], lut[g as usize], lut[b as usize]);

    let x = (0.412453 * r + 0.357580 * g + 0.180423 * b) / WHITE_X;
    let y = 0.212671 * r + 0.715160 * g + 0.072169 * b;
    let z = (0.019334 * r + 0.119193 * g + 0.950227 * b) / WHITE_Z;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    let l = if y > EPSILON { 116.0 * fy - 16.0 } else { 903.3 * y };
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    [
        to_u8(l * 255.0 / 100.0),
        to_u8(a + 128.0),
        to_u8(b + 128.0),
    ]
}

/// Convert one 8-bit L*a*b* pixel back to 8-bit sRGB.
pub fn lab_to_rgb([l, a, b]: [u8; 3]) -> [u8; 3] {
    let l = l as f32 * 100.0 / 255.0;
    let a = a as f32 - 128.0;
    let b = b as f32 - 128.0;

    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let y = if l > 903.3 * EPSILON { fy * fy * fy } else { l / 903.3 };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240479 * x - 1.537150 * y - 0.498535 * z;
    let g = -0.969256 * x + 1.875991 * y + 0.041556 * z;
    let b = 0.055648 * x - 0.204043 * y + 1.057311 * z;

    [
        to_u8(linear_to_srgb(r) * 255.0),
        to_u8(linear_to_srgb(g) * 255.0),
        to_u8(linear_to_srgb(b) * 255.0),
    ]
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(t: f32) -> f32 {
    if t > 6.0 / 29.0 {
        t * t * t
    } else {
        (t - 16.0 / 116.0) / 7.787
    }
}

fn srgb_to_linear_table() -> [f32; 256] {
    let mut table = [0.0f32; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let c = i as f32 / 255.0;
        *slot = if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        };
    }
    table
}

fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
