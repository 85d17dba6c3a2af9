// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Working raster — the single channel layout every geometric and photometric
// stage operates on, plus decode/encode helpers for the I/O boundary.

use folio_core::error::{FolioError, Result};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use tracing::{debug, info, instrument};

/// Channel layout of the image handed to the pipeline, remembered so the
/// result can be returned in the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorLayout {
    Luma,
    LumaAlpha,
    Rgb,
    Rgba,
}

impl ColorLayout {
    /// Layout of a decoded image.
    pub fn of(image: &DynamicImage) -> Self {
        let color = image.color();
        match (color.has_color(), color.has_alpha()) {
            (false, false) => Self::Luma,
            (false, true) => Self::LumaAlpha,
            (true, false) => Self::Rgb,
            (true, true) => Self::Rgba,
        }
    }
}

/// An 8-bit raster in the internal channel order: either single-channel luma
/// or three-channel RGB. Alpha never enters the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    Gray(GrayImage),
    Color(RgbImage),
}

impl Raster {
    // -- Conversion at the boundary -------------------------------------------

    /// Convert a decoded image into the internal layout. Colour sources become
    /// RGB (alpha dropped), everything else becomes luma.
    pub fn from_dynamic(image: &DynamicImage) -> Self {
        if image.color().has_color() {
            Self::Color(image.to_rgb8())
        } else {
            Self::Gray(image.to_luma8())
        }
    }

    /// Convert back to `layout`. Alpha channels are restored fully opaque.
    pub fn into_dynamic(self, layout: ColorLayout) -> DynamicImage {
        let dynamic = match self {
            Self::Gray(gray) => DynamicImage::ImageLuma8(gray),
            Self::Color(rgb) => DynamicImage::ImageRgb8(rgb),
        };
        match layout {
            ColorLayout::Luma => DynamicImage::ImageLuma8(dynamic.into_luma8()),
            ColorLayout::LumaAlpha => DynamicImage::ImageLumaA8(dynamic.into_luma_alpha8()),
            ColorLayout::Rgb => DynamicImage::ImageRgb8(dynamic.into_rgb8()),
            ColorLayout::Rgba => DynamicImage::ImageRgba8(dynamic.into_rgba8()),
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        match self {
            Self::Gray(img) => img.width(),
            Self::Color(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Self::Gray(img) => img.height(),
            Self::Color(img) => img.height(),
        }
    }

    /// Number of channels per pixel (1 or 3).
    pub fn channels(&self) -> u8 {
        match self {
            Self::Gray(_) => 1,
            Self::Color(_) => 3,
        }
    }

    /// True when either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    // -- Photometric helpers --------------------------------------------------

    /// Grayscale copy; single-channel rasters pass through unchanged.
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Self::Gray(img) => img.clone(),
            Self::Color(img) => image::imageops::grayscale(img),
        }
    }

    /// Per-channel `saturate(|v * gain + bias|)`.
    pub fn scale_abs(&self, gain: f32, bias: f32) -> Self {
        match self {
            Self::Gray(img) => Self::Gray(scale_abs(img, gain, bias)),
            Self::Color(img) => {
                let mut out = img.clone();
                for v in out.iter_mut() {
                    *v = scale_abs_value(*v, gain, bias);
                }
                Self::Color(out)
            }
        }
    }
}

/// `saturate(|v * gain + bias|)` over a single-channel image.
pub fn scale_abs(gray: &GrayImage, gain: f32, bias: f32) -> GrayImage {
    let mut out = gray.clone();
    for v in out.iter_mut() {
        *v = scale_abs_value(*v, gain, bias);
    }
    out
}

fn scale_abs_value(value: u8, gain: f32, bias: f32) -> u8 {
    (value as f32 * gain + bias).abs().round().min(255.0) as u8
}

// -- I/O boundary -------------------------------------------------------------

/// Load an image from a file path.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn open(path: impl AsRef<std::path::Path>) -> Result<DynamicImage> {
    let img = image::open(path.as_ref()).map_err(|err| {
        FolioError::ImageError(format!("failed to open {}: {}", path.as_ref().display(), err))
    })?;
    info!(width = img.width(), height = img.height(), "Image loaded");
    Ok(img)
}

/// Decode raw encoded bytes (JPEG, PNG, etc.).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(data)
        .map_err(|err| FolioError::ImageError(format!("failed to decode image: {}", err)))?;
    debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
    Ok(img)
}

/// Encode an image as PNG bytes.
pub fn to_png_bytes(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| FolioError::ImageError(format!("PNG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Encode an image as JPEG bytes with the given quality (1-100).
pub fn to_jpeg_bytes(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let rgb = image.to_rgb8();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|err| FolioError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Write an image to a file. The format is inferred from the file extension.
pub fn save(image: &DynamicImage, path: impl AsRef<std::path::Path>) -> Result<()> {
    image.save(path.as_ref()).map_err(|err| {
        FolioError::ImageError(format!(
            "failed to save image to {}: {}",
            path.as_ref().display(),
            err
        ))
    })
}
