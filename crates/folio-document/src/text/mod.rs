// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text module — detection-provider abstraction, fragment normalization, and
// reading-order reconstruction.

pub mod engine;
pub mod fragment;
pub mod reading_order;

pub use engine::{DetectionEngine, EngineState, TextDetector};
pub use fragment::{RawDetection, RawRegion, normalize_detections};
pub use reading_order::{Line, ReadingOrder, ReconstructedDocument, TextStats};
