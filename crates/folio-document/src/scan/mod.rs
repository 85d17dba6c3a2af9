// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — perspective rectification, binarization, local contrast
// equalization, enhancement, and optical character recognition (OCR).

pub mod clahe;
pub mod enhance;
pub mod rectify;
pub mod threshold;

#[cfg(feature = "ocr")]
pub mod ocr;

pub use enhance::Enhancer;
pub use rectify::Rectifier;

#[cfg(feature = "ocr")]
pub use ocr::{OcrConfig, OcrsDetector};
