// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Normalization of engine-specific detection output into canonical
// `TextFragment`s, ordered top-to-bottom by vertical centre.

use folio_core::TextFragment;
use folio_core::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Geometry as reported by a detection engine.
///
/// Deserializes from either `{"left", "top", "right", "bottom"}` or
/// `{"points": [[x, y]; 4]}` with points in top-left, top-right,
/// bottom-right, bottom-left order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRegion {
    Rect {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
    Quad {
        points: [[i32; 2]; 4],
    },
}

impl RawRegion {
    /// `(min_x, max_x, min_y, max_y)`.
    ///
    /// Quadrilaterals take their horizontal extent from the top edge and their
    /// vertical extent from the left edge.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        match *self {
            Self::Rect {
                left,
                top,
                right,
                bottom,
            } => (left, right, top, bottom),
            Self::Quad { points } => {
                let [top_left, top_right, _, bottom_left] = points;
                (top_left[0], top_right[0], top_left[1], bottom_left[1])
            }
        }
    }
}

/// One piece of recognised text with its engine-native geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDetection {
    pub text: String,
    pub region: RawRegion,
}

impl RawDetection {
    pub fn new(text: impl Into<String>, region: RawRegion) -> Self {
        Self {
            text: text.into(),
            region,
        }
    }

    pub fn into_fragment(self) -> TextFragment {
        let (min_x, max_x, min_y, max_y) = self.region.bounds();
        TextFragment::new(self.text, min_x, max_x, min_y, max_y)
    }
}

/// Parse a JSON array of raw detections.
pub fn parse_detections(json: &str) -> Result<Vec<RawDetection>> {
    Ok(serde_json::from_str(json)?)
}

/// Convert raw detections to fragments ready for reading-order
/// reconstruction: blank or inverted ones are dropped, the rest are sorted
/// by vertical centre (stable, so equal centres keep engine order).
pub fn normalize_detections(raw: impl IntoIterator<Item = RawDetection>) -> Vec<TextFragment> {
    order_fragments(raw.into_iter().map(RawDetection::into_fragment).collect())
}

/// Drop degenerate fragments and sort the rest by vertical centre.
pub fn order_fragments(fragments: Vec<TextFragment>) -> Vec<TextFragment> {
    let total = fragments.len();
    let mut kept: Vec<TextFragment> = fragments
        .into_iter()
        .filter(|f| !f.is_degenerate())
        .collect();
    if kept.len() < total {
        debug!(dropped = total - kept.len(), "Dropped blank or degenerate fragments");
    }
    kept.sort_by_key(TextFragment::center_y);
    kept
}
