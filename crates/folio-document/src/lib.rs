// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// folio-document — Document processing for Folio.
//
// Provides perspective rectification of a photographed page, a multi-stage
// enhancement pipeline for print-legible output, and reconstruction of
// reading-order text from independently detected fragments.

pub mod image;
pub mod scan;
pub mod text;

// Re-export the primary structs so callers can use `folio_document::Rectifier` etc.
pub use crate::image::raster::{ColorLayout, Raster};
pub use scan::enhance::Enhancer;
pub use scan::rectify::Rectifier;
pub use text::engine::{DetectionEngine, EngineState, TextDetector};
pub use text::fragment::{RawDetection, RawRegion, normalize_detections};
pub use text::reading_order::{Line, ReadingOrder, ReconstructedDocument, TextStats};

#[cfg(feature = "ocr")]
pub use scan::ocr::{OcrConfig, OcrsDetector};
