// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// `ocrs`-backed text detector.
//
// Only compiled with the `ocr` feature. The engine needs two model files,
// `text-detection.rten` and `text-recognition.rten`, looked up by default in
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`, where `ocrs-cli` caches
// them on first run). Models are never downloaded from here.

use std::path::{Path, PathBuf};

use folio_core::TextFragment;
use folio_core::error::{FolioError, Result};
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine, OcrEngineParams, TextItem};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::text::engine::TextDetector;

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `$XDG_CACHE_HOME/ocrs`, falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Both models inside `dir` under their standard file names.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Fail early with a readable message when a model file is missing.
    pub fn validate(&self) -> Result<()> {
        for (role, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(FolioError::OcrError(format!(
                    "{role} model not found at {}; run `ocrs-cli` once to cache the models",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// True when both model files are present.
    pub fn models_available(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Word-level detector on top of the `ocrs` engine.
pub struct OcrsDetector {
    engine: OcrEngine,
}

impl OcrsDetector {
    /// Load both models. This is the expensive step; run it once, typically
    /// as the loader passed to `DetectionEngine::initialize`.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn load(config: &OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR models");
        let detection_model = load_model(&config.detection_model_path)?;
        let recognition_model = load_model(&config.recognition_model_path)?;

        let engine = OcrEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| FolioError::OcrError(format!("failed to initialise OCR engine: {err}")))?;

        info!("OCR engine loaded");
        Ok(Self { engine })
    }
}

fn load_model(path: &Path) -> Result<Model> {
    Model::load_file(path).map_err(|err| {
        FolioError::OcrError(format!("failed to load model from {}: {err}", path.display()))
    })
}

impl TextDetector for OcrsDetector {
    fn name(&self) -> &str {
        "ocrs"
    }

    /// One fragment per recognised word, bounded by the word's axis-aligned
    /// rectangle.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn detect(&self, image: &DynamicImage) -> Result<Vec<TextFragment>> {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            FolioError::OcrError(format!("failed to create image source ({width}x{height}): {err}"))
        })?;
        let input = self
            .engine
            .prepare_input(source)
            .map_err(|err| FolioError::OcrError(format!("OCR preprocessing failed: {err}")))?;

        let word_rects = self
            .engine
            .detect_words(&input)
            .map_err(|err| FolioError::OcrError(format!("word detection failed: {err}")))?;
        let line_rects = self.engine.find_text_lines(&input, &word_rects);
        debug!(words = word_rects.len(), lines = line_rects.len(), "Text regions detected");

        let lines = self
            .engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| FolioError::OcrError(format!("line recognition failed: {err}")))?;

        let mut fragments = Vec::new();
        for line in lines.iter().flatten() {
            for word in line.words() {
                let text = word.to_string();
                if text.trim().is_empty() {
                    continue;
                }
                let rect = word.bounding_rect();
                fragments.push(TextFragment::new(
                    text,
                    rect.left(),
                    rect.right(),
                    rect.top(),
                    rect.bottom(),
                ));
            }
        }

        debug!(fragments = fragments.len(), "OCR fragments extracted");
        Ok(fragments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_standard_file_names() {
        let config = OcrConfig::default();
        assert!(config.detection_model_path.ends_with(DETECTION_MODEL_FILENAME));
        assert!(config.recognition_model_path.ends_with(RECOGNITION_MODEL_FILENAME));
    }

    #[test]
    fn from_dir_joins_file_names() {
        let config = OcrConfig::from_dir("/srv/models");
        assert_eq!(config.detection_model_path, PathBuf::from("/srv/models/text-detection.rten"));
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/srv/models/text-recognition.rten")
        );
    }

    #[test]
    fn missing_models_fail_validation() {
        let config = OcrConfig::from_dir("/nonexistent/ocr-models");
        assert!(matches!(config.validate(), Err(FolioError::OcrError(_))));
        assert!(!config.models_available());
        assert!(OcrsDetector::load(&config).is_err());
    }
}
