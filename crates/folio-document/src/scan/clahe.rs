// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization (CLAHE).
//
// The image is split into a `tiles x tiles` grid. Each tile gets its own
// equalization curve built from a clipped histogram; every output pixel is a
// bilinear blend of the curves of the four nearest tile centres, which hides
// the tile seams. Images whose sides are not a multiple of the grid are padded
// by reflect-101 before the histograms are collected.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::image::filter::reflect101;

const BINS: usize = 256;

/// Equalize `gray` tile-wise with a histogram clip of `clip_limit` times the
/// average bin height.
pub fn clahe(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return gray.clone();
    }
    let tiles = tiles.max(1);

    let tile_w = width.div_ceil(tiles);
    let tile_h = height.div_ceil(tiles);
    let tile_area = (tile_w * tile_h) as usize;

    let clip = if clip_limit > 0.0 {
        ((clip_limit * tile_area as f32 / BINS as f32) as usize).max(1)
    } else {
        usize::MAX
    };
    debug!(tile_w, tile_h, clip, "Building CLAHE tile curves");

    let mut luts = vec![[0u8; BINS]; (tiles * tiles) as usize];
    for ty in 0..tiles {
        for tx in 0..tiles {
            let mut hist = [0usize; BINS];
            for y in ty * tile_h..(ty + 1) * tile_h {
                let sy = reflect101(y as i64, height as i64) as u32;
                for x in tx * tile_w..(tx + 1) * tile_w {
                    let sx = reflect101(x as i64, width as i64) as u32;
                    hist[gray.get_pixel(sx, sy).0[0] as usize] += 1;
                }
            }
            clip_histogram(&mut hist, clip);
            luts[(ty * tiles + tx) as usize] = equalization_curve(&hist, tile_area);
        }
    }

    let inv_tw = 1.0 / tile_w as f32;
    let inv_th = 1.0 / tile_h as f32;
    let last = tiles as i64 - 1;

    GrayImage::from_fn(width, height, |x, y| {
        let (ty1, ty2, ya) = neighbours(y as f32 * inv_th - 0.5, last);
        let (tx1, tx2, xa) = neighbours(x as f32 * inv_tw - 0.5, last);
        let v = gray.get_pixel(x, y).0[0] as usize;

        let lut = |ty: usize, tx: usize| luts[ty * tiles as usize + tx][v] as f32;
        let top = lut(ty1, tx1) * (1.0 - xa) + lut(ty1, tx2) * xa;
        let bottom = lut(ty2, tx1) * (1.0 - xa) + lut(ty2, tx2) * xa;
        let res = top * (1.0 - ya) + bottom * ya;
        Luma([res.round().clamp(0.0, 255.0) as u8])
    })
}

/// The two tile indices surrounding a fractional tile coordinate and the
/// weight of the second one.
fn neighbours(pos: f32, last: i64) -> (usize, usize, f32) {
    let first = pos.floor();
    let frac = pos - first;
    let first = first as i64;
    let lo = first.clamp(0, last) as usize;
    let hi = (first + 1).clamp(0, last) as usize;
    (lo, hi, frac)
}

/// Cap every bin at `clip` and spread the excess evenly over all bins.
fn clip_histogram(hist: &mut [usize; BINS], clip: usize) {
    if clip == usize::MAX {
        return;
    }
    let mut excess = 0usize;
    for bin in hist.iter_mut() {
        if *bin > clip {
            excess += *bin - clip;
            *bin = clip;
        }
    }

    let batch = excess / BINS;
    let mut residual = excess - batch * BINS;
    for bin in hist.iter_mut() {
        *bin += batch;
    }

    if residual > 0 {
        let step = (BINS / residual).max(1);
        let mut i = 0;
        while i < BINS && residual > 0 {
            hist[i] += 1;
            residual -= 1;
            i += step;
        }
    }
}

/// Cumulative distribution scaled to 0..=255.
fn equalization_curve(hist: &[usize; BINS], area: usize) -> [u8; BINS] {
    let scale = 255.0 / area as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0usize;
    for (i, &count) in hist.iter().enumerate() {
        sum += count;
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
