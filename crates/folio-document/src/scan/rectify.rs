// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — maps four user-selected page corners onto an
// upright rectangle sized from the page's estimated proportions, then hands
// the flattened page to the enhancement pipeline.

use folio_core::config::{AppConfig, RectifyConfig};
use folio_core::error::{FolioError, Result};
use folio_core::{Point, Quad};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use tracing::{debug, info, instrument, warn};

use super::enhance::Enhancer;
use crate::image::raster::{ColorLayout, Raster};

/// Flattens a photographed page given its four corners.
///
/// The public result of [`Rectifier::rectify`] is the warped page *after*
/// enhancement; [`Rectifier::warp`] exposes the raw geometric step.
#[derive(Debug, Clone, Default)]
pub struct Rectifier {
    config: RectifyConfig,
    enhancer: Enhancer,
}

impl Rectifier {
    pub fn new(config: RectifyConfig, enhancer: Enhancer) -> Self {
        Self { config, enhancer }
    }

    /// Build from the persisted application settings.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.rectify.clone(), Enhancer::new(config.enhance.clone()))
    }

    pub fn enhancer(&self) -> &Enhancer {
        &self.enhancer
    }

    // -- Public pipeline ------------------------------------------------------

    /// Rectify and enhance `source` using caller-supplied corners in the order
    /// top-left, top-right, bottom-right, bottom-left.
    ///
    /// Fails with `InvalidInput` unless exactly four finite points are given.
    #[instrument(skip_all, fields(width = source.width(), height = source.height(), corners = corners.len()))]
    pub fn rectify(&self, source: &DynamicImage, corners: &[Point]) -> Result<DynamicImage> {
        let quad = Quad::from_points(corners)?;
        self.rectify_quad(source, &quad)
    }

    /// [`Rectifier::rectify`] for an already validated quadrilateral.
    pub fn rectify_quad(&self, source: &DynamicImage, quad: &Quad) -> Result<DynamicImage> {
        let layout = ColorLayout::of(source);
        let warped = self.warp_raster(&Raster::from_dynamic(source), quad)?;
        let enhanced = self.enhancer.enhance_raster(&warped);
        info!(
            width = enhanced.width(),
            height = enhanced.height(),
            "Document rectified and enhanced"
        );
        Ok(enhanced.into_dynamic(layout))
    }

    /// Perspective warp only, without enhancement.
    pub fn warp(&self, source: &DynamicImage, quad: &Quad) -> Result<DynamicImage> {
        let layout = ColorLayout::of(source);
        let warped = self.warp_raster(&Raster::from_dynamic(source), quad)?;
        Ok(warped.into_dynamic(layout))
    }

    // -- Geometry -------------------------------------------------------------

    /// Output dimensions for `quad`.
    ///
    /// Width is the longer of the top and bottom edges, height the longer of
    /// the left and right edges. Implausible proportions are replaced by the
    /// fallback paper's ratio, and the result is scaled down so neither side
    /// exceeds the configured maximum.
    pub fn target_size(&self, quad: &Quad) -> Result<(u32, u32)> {
        let c = &self.config;
        let mut width = quad.max_width();
        let mut height = quad.max_height();
        debug!(width, height, "Estimated document size");

        if !(width > c.min_edge && height > c.min_edge) {
            return Err(FolioError::DegenerateGeometry { width, height });
        }

        let mut aspect = width / height;
        if aspect < c.min_aspect || aspect > c.max_aspect {
            let fallback = c.fallback_paper.aspect_ratio();
            warn!(
                aspect,
                fallback,
                paper = ?c.fallback_paper,
                "Implausible aspect ratio; using paper proportions"
            );
            aspect = fallback;
            height = width / aspect;
        }

        let max = c.max_dimension as f64;
        if width > max {
            width = max;
            height = width / aspect;
        }
        if height > max {
            height = max;
            width = height * aspect;
        }

        let (out_w, out_h) = (width as u32, height as u32);
        if out_w == 0 || out_h == 0 {
            return Err(FolioError::TransformFailed {
                width: out_w,
                height: out_h,
            });
        }
        Ok((out_w, out_h))
    }

    fn warp_raster(&self, source: &Raster, quad: &Quad) -> Result<Raster> {
        if source.is_empty() {
            return Err(FolioError::InvalidInput(format!(
                "source image is empty ({}x{})",
                source.width(),
                source.height()
            )));
        }

        let (out_w, out_h) = self.target_size(quad)?;

        let src = quad.corners().map(|p| (p.x as f32, p.y as f32));
        let (right, bottom) = ((out_w - 1) as f32, (out_h - 1) as f32);
        let dest = [(0.0, 0.0), (right, 0.0), (right, bottom), (0.0, bottom)];

        let projection =
            Projection::from_control_points(src, dest).ok_or(FolioError::TransformSingular)?;

        let warped = match source {
            Raster::Gray(img) => {
                let mut out = GrayImage::new(out_w, out_h);
                warp_into(img, &projection, Interpolation::Bilinear, Luma([0u8]), &mut out);
                Raster::Gray(out)
            }
            Raster::Color(img) => {
                let mut out = RgbImage::new(out_w, out_h);
                warp_into(img, &projection, Interpolation::Bilinear, Rgb([0u8, 0, 0]), &mut out);
                Raster::Color(out)
            }
        };

        if warped.is_empty() {
            return Err(FolioError::TransformFailed {
                width: warped.width(),
                height: warped.height(),
            });
        }

        debug!(out_w, out_h, "Perspective warp applied");
        Ok(warped)
    }
}
