// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for document rectification and text reconstruction.

use serde::{Deserialize, Serialize};

use crate::error::{FolioError, Result};

/// A real-valued 2D coordinate in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Four document corners in canonical order:
/// `[top_left, top_right, bottom_right, bottom_left]`.
///
/// The ordering is trusted as given; it is never re-sorted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quad([Point; 4]);

impl Quad {
    pub const fn new(corners: [Point; 4]) -> Self {
        Self(corners)
    }

    /// Build a quad from a caller-supplied slice, rejecting anything other than
    /// exactly four finite points.
    pub fn from_points(points: &[Point]) -> Result<Self> {
        let corners: [Point; 4] = points.try_into().map_err(|_| {
            FolioError::InvalidInput(format!("expected 4 corner points, got {}", points.len()))
        })?;
        if let Some(bad) = corners.iter().find(|p| !p.is_finite()) {
            return Err(FolioError::InvalidInput(format!(
                "corner point is not finite: ({}, {})",
                bad.x, bad.y
            )));
        }
        Ok(Self(corners))
    }

    /// Rectangle inset by `margin` on every side of a `width` x `height`
    /// image. The margin shrinks when the image is too small to hold it.
    pub fn inset(width: u32, height: u32, margin: f64) -> Self {
        let (w, h) = (width as f64, height as f64);
        let mx = margin.max(0.0).min(w / 4.0);
        let my = margin.max(0.0).min(h / 4.0);
        Self([
            Point::new(mx, my),
            Point::new(w - mx, my),
            Point::new(w - mx, h - my),
            Point::new(mx, h - my),
        ])
    }

    pub fn corners(&self) -> &[Point; 4] {
        &self.0
    }

    pub fn top_left(&self) -> Point {
        self.0[0]
    }

    pub fn top_right(&self) -> Point {
        self.0[1]
    }

    pub fn bottom_right(&self) -> Point {
        self.0[2]
    }

    pub fn bottom_left(&self) -> Point {
        self.0[3]
    }

    /// Larger of the top and bottom edge lengths.
    pub fn max_width(&self) -> f64 {
        let top = self.top_left().distance(&self.top_right());
        let bottom = self.bottom_left().distance(&self.bottom_right());
        top.max(bottom)
    }

    /// Larger of the left and right edge lengths.
    pub fn max_height(&self) -> f64 {
        let left = self.top_left().distance(&self.bottom_left());
        let right = self.top_right().distance(&self.bottom_right());
        left.max(right)
    }
}

/// One detected region of recognised text in canonical form.
///
/// Fields are fixed at construction; `center_y` is the integer midpoint of the
/// vertical extent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFragment {
    text: String,
    min_x: i32,
    max_x: i32,
    min_y: i32,
    max_y: i32,
    center_y: i32,
}

impl TextFragment {
    pub fn new(text: impl Into<String>, min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self {
            text: text.into(),
            min_x,
            max_x,
            min_y,
            max_y,
            center_y: ((i64::from(min_y) + i64::from(max_y)) / 2) as i32,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn min_x(&self) -> i32 {
        self.min_x
    }

    pub fn max_x(&self) -> i32 {
        self.max_x
    }

    pub fn min_y(&self) -> i32 {
        self.min_y
    }

    pub fn max_y(&self) -> i32 {
        self.max_y
    }

    pub fn center_y(&self) -> i32 {
        self.center_y
    }

    /// Blank text or an inverted box.
    pub fn is_degenerate(&self) -> bool {
        self.text.trim().is_empty() || self.max_x < self.min_x || self.max_y < self.min_y
    }
}

/// Standard paper sizes, used as the fallback page shape when the detected
/// aspect ratio is implausible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A3 => (297, 420),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Portrait width / height ratio.
    pub fn aspect_ratio(&self) -> f64 {
        let (w, h) = self.dimensions_mm();
        if h == 0 {
            return 1.0;
        }
        w as f64 / h as f64
    }
}

/// What kind of scan produced a history record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanKind {
    /// Text recognition over a photographed page.
    Ocr,
    /// Rectified + enhanced document image.
    Document,
    /// Barcode / QR scan.
    Barcode,
}

impl ScanKind {
    /// Stable storage keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ocr => "ocr",
            Self::Document => "document",
            Self::Barcode => "scan code",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ocr" => Some(Self::Ocr),
            "document" => Some(Self::Document),
            "scan code" => Some(Self::Barcode),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_y_truncates() {
        let frag = TextFragment::new("abc", 0, 10, 3, 6);
        assert_eq!(frag.center_y(), 4);
    }

    #[test]
    fn center_y_of_extreme_coordinates() {
        let frag = TextFragment::new("a", -2_000_000_000, -1_999_999_990, 1_500_000_000, 1_500_000_010);
        assert_eq!(frag.center_y(), 1_500_000_005);
        let frag = TextFragment::new("b", 0, 1, i32::MAX - 1, i32::MAX);
        assert_eq!(frag.center_y(), i32::MAX - 1);
        let frag = TextFragment::new("c", 0, 1, i32::MIN, i32::MIN + 1);
        assert_eq!(frag.center_y(), i32::MIN + 1);
    }

    #[test]
    fn quad_from_points_rejects_wrong_count() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(1.0, 1.0)];
        let err = Quad::from_points(&pts).unwrap_err();
        assert!(matches!(err, FolioError::InvalidInput(_)));
    }

    #[test]
    fn quad_from_points_rejects_nan() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(f64::NAN, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!(Quad::from_points(&pts).is_err());
    }

    #[test]
    fn quad_edge_estimates_take_the_longer_side() {
        let quad = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(120.0, 50.0),
            Point::new(0.0, 60.0),
        ]);
        assert!((quad.max_width() - 120.0).abs() < 1e-3);
        assert!((quad.max_height() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn inset_clamps_for_small_images() {
        let quad = Quad::inset(40, 400, 60.0);
        assert_eq!(quad.top_left(), Point::new(10.0, 60.0));
        assert_eq!(quad.bottom_right(), Point::new(30.0, 340.0));
    }

    #[test]
    fn a4_ratio() {
        assert!((PaperSize::A4.aspect_ratio() - 210.0 / 297.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_fragments() {
        assert!(TextFragment::new("  ", 0, 5, 0, 5).is_degenerate());
        assert!(TextFragment::new("x", 10, 5, 0, 5).is_degenerate());
        assert!(!TextFragment::new("x", 0, 5, 0, 5).is_degenerate());
    }

    #[test]
    fn scan_kind_keywords_round_trip() {
        for kind in [ScanKind::Ocr, ScanKind::Document, ScanKind::Barcode] {
            assert_eq!(ScanKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ScanKind::parse("fax"), None);
    }
}
