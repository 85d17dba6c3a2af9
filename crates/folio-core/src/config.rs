// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::PaperSize;
use crate::error::{FolioError, Result};

/// Persistent application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rectify: RectifyConfig,
    pub enhance: EnhanceConfig,
    pub reading_order: ReadingOrderConfig,
    /// Recognition language chosen by the user. Carried for the caller; the
    /// core pipeline never dispatches on it.
    pub ocr_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rectify: RectifyConfig::default(),
            enhance: EnhanceConfig::default(),
            reading_order: ReadingOrderConfig::default(),
            ocr_language: Self::DEFAULT_LANGUAGE.to_string(),
        }
    }
}

/// Geometry limits for perspective rectification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    /// Estimated width or height at or below this is rejected as degenerate.
    pub min_edge: f64,
    /// Lowest accepted width/height ratio before falling back to `fallback_paper`.
    pub min_aspect: f64,
    /// Highest accepted width/height ratio before falling back to `fallback_paper`.
    pub max_aspect: f64,
    /// Page shape used when the detected ratio is out of bounds.
    pub fallback_paper: PaperSize,
    /// Longest allowed output side in pixels.
    pub max_dimension: u32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            min_edge: 10.0,
            min_aspect: 0.5,
            max_aspect: 2.0,
            fallback_paper: PaperSize::A4,
            max_dimension: 2000,
        }
    }
}

/// How the adaptive threshold computes its local reference level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdaptiveMethod {
    /// Box mean over the block.
    Mean,
    /// Gaussian-weighted mean over the block.
    Gaussian,
}

/// Parameters of the print-legibility enhancement pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    pub contrast_gain: f32,
    /// Odd block size of the adaptive threshold window.
    pub adaptive_block_size: u32,
    pub adaptive_offset: i32,
    pub adaptive_method: AdaptiveMethod,
    /// Subtracted from the Otsu level before the second binarization.
    pub otsu_offset: f64,
    pub clahe_clip_limit: f32,
    pub clahe_tiles: u32,
    pub luminance_gain: f32,
    pub luminance_bias: f32,
    pub sharpen_center: f32,
    pub sharpen_side: f32,
    pub bilateral_diameter: u32,
    pub bilateral_sigma_color: f32,
    pub bilateral_sigma_space: f32,
    /// Weight of the binary mask in the final blend (the photometric image gets
    /// `1 - mask_weight`).
    pub mask_weight: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            contrast_gain: 1.2,
            adaptive_block_size: 25,
            adaptive_offset: 5,
            adaptive_method: AdaptiveMethod::Gaussian,
            otsu_offset: 10.0,
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            luminance_gain: 1.3,
            luminance_bias: 5.0,
            sharpen_center: 3.0,
            sharpen_side: -0.5,
            bilateral_diameter: 5,
            bilateral_sigma_color: 50.0,
            bilateral_sigma_space: 50.0,
            mask_weight: 0.3,
        }
    }
}

/// Thresholds for line clustering and whitespace synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadingOrderConfig {
    /// Largest center-Y difference between consecutive fragments on one line.
    pub line_threshold: i32,
    /// Pixels of horizontal gap per synthesized space.
    pub space_unit: i32,
}

impl Default for ReadingOrderConfig {
    fn default() -> Self {
        Self {
            line_threshold: 30,
            space_unit: 10,
        }
    }
}

impl AppConfig {
    /// Language used when the user never picked one.
    pub const DEFAULT_LANGUAGE: &'static str = "local_en_zh";

    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_json::from_str(&data)?;
        if config.ocr_language.trim().is_empty() {
            config.ocr_language = Self::DEFAULT_LANGUAGE.to_string();
        }
        config.validate()?;
        debug!(path = %path.as_ref().display(), "config loaded");
        Ok(config)
    }

    /// Read a JSON config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                warn!(path = %path.as_ref().display(), error = %err, "using default config");
                Self::default()
            }
        }
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    /// Reject values the pipelines cannot run with.
    pub fn validate(&self) -> Result<()> {
        let r = &self.rectify;
        if !(r.min_aspect > 0.0 && r.min_aspect <= r.max_aspect) {
            return Err(FolioError::Config(format!(
                "aspect bounds must satisfy 0 < min <= max, got [{}, {}]",
                r.min_aspect, r.max_aspect
            )));
        }
        if r.max_dimension == 0 {
            return Err(FolioError::Config("max_dimension must be positive".into()));
        }
        let e = &self.enhance;
        if e.adaptive_block_size < 3 || e.adaptive_block_size % 2 == 0 {
            return Err(FolioError::Config(format!(
                "adaptive_block_size must be odd and >= 3, got {}",
                e.adaptive_block_size
            )));
        }
        if e.clahe_tiles == 0 {
            return Err(FolioError::Config("clahe_tiles must be positive".into()));
        }
        if !(0.0..=1.0).contains(&e.mask_weight) {
            return Err(FolioError::Config(format!(
                "mask_weight must be within [0, 1], got {}",
                e.mask_weight
            )));
        }
        if self.reading_order.space_unit <= 0 {
            return Err(FolioError::Config("space_unit must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_pipeline_constants() {
        let config = AppConfig::default();
        assert_eq!(config.rectify.max_dimension, 2000);
        assert_eq!(config.rectify.fallback_paper, PaperSize::A4);
        assert_eq!(config.enhance.adaptive_block_size, 25);
        assert_eq!(config.reading_order.line_threshold, 30);
        assert_eq!(config.reading_order.space_unit, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = AppConfig::default();
        config.ocr_language = "ja".into();
        config.rectify.fallback_paper = PaperSize::Letter;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.ocr_language, "ja");
        assert_eq!(loaded.rectify.fallback_paper, PaperSize::Letter);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "reading_order": { "line_threshold": 12 } }"#).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.reading_order.line_threshold, 12);
        assert_eq!(loaded.reading_order.space_unit, 10);
        assert_eq!(loaded.ocr_language, AppConfig::DEFAULT_LANGUAGE);
        assert_eq!(loaded.enhance.clahe_tiles, 8);
    }

    #[test]
    fn missing_file_falls_back() {
        let config = AppConfig::load_or_default("/nonexistent/folio/config.json");
        assert_eq!(config.rectify.min_edge, 10.0);
    }

    #[test]
    fn even_block_size_is_rejected() {
        let mut config = AppConfig::default();
        config.enhance.adaptive_block_size = 24;
        assert!(matches!(config.validate(), Err(FolioError::Config(_))));
    }
}
