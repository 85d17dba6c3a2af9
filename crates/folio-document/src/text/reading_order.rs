// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reading-order reconstruction — groups fragments already ordered by vertical
// centre into lines, orders each line left to right, and rebuilds the
// horizontal whitespace between fragments from their pixel gaps.

use folio_core::TextFragment;
use folio_core::config::ReadingOrderConfig;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Fragments that share one visual line, in left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    fragments: Vec<TextFragment>,
}

impl Line {
    pub fn fragments(&self) -> &[TextFragment] {
        &self.fragments
    }

    /// Join the fragments, inserting one space per `space_unit` pixels of gap
    /// (at least one), and exactly one where boxes touch or overlap.
    pub fn render(&self, space_unit: i32) -> String {
        let unit = i64::from(space_unit.max(1));
        let mut out = String::new();
        let mut previous: Option<&TextFragment> = None;

        for fragment in &self.fragments {
            if let Some(prev) = previous {
                let gap = i64::from(fragment.min_x()) - i64::from(prev.max_x());
                let spaces = if gap <= 0 {
                    1
                } else {
                    ((gap + unit - 1) / unit).max(1)
                };
                out.push_str(&" ".repeat(spaces as usize));
            }
            out.push_str(fragment.text());
            previous = Some(fragment);
        }

        out
    }
}

/// Line clustering and whitespace synthesis.
#[derive(Debug, Clone)]
pub struct ReadingOrder {
    line_threshold: i32,
    space_unit: i32,
}

impl Default for ReadingOrder {
    fn default() -> Self {
        Self::new(&ReadingOrderConfig::default())
    }
}

impl ReadingOrder {
    pub fn new(config: &ReadingOrderConfig) -> Self {
        Self {
            line_threshold: config.line_threshold,
            space_unit: config.space_unit,
        }
    }

    /// Cluster fragments into lines.
    ///
    /// Input is expected in vertical-centre order and is not re-sorted. A
    /// fragment joins the current line when its centre is within the line
    /// threshold of the fragment *immediately before it*; otherwise it opens a
    /// new line. Blank or inverted fragments are skipped.
    pub fn lines(&self, fragments: &[TextFragment]) -> Vec<Line> {
        let mut lines: Vec<Line> = Vec::new();
        let mut current: Vec<TextFragment> = Vec::new();
        let mut last_center: Option<i64> = None;

        for fragment in fragments {
            if fragment.is_degenerate() {
                debug!(text = fragment.text(), "Skipping degenerate fragment");
                continue;
            }
            let center = i64::from(fragment.center_y());
            if last_center.is_some_and(|c| (center - c).abs() > i64::from(self.line_threshold)) {
                lines.push(close_line(std::mem::take(&mut current)));
            }
            last_center = Some(center);
            current.push(fragment.clone());
        }

        if !current.is_empty() {
            lines.push(close_line(current));
        }
        lines
    }

    /// Reconstructed text, one string per line, top to bottom.
    #[instrument(skip_all, fields(fragments = fragments.len()))]
    pub fn reconstruct(&self, fragments: &[TextFragment]) -> Vec<String> {
        let lines: Vec<String> = self
            .lines(fragments)
            .iter()
            .map(|line| line.render(self.space_unit))
            .collect();
        debug!(lines = lines.len(), "Reading order reconstructed");
        lines
    }

    pub fn reconstruct_document(&self, fragments: &[TextFragment]) -> ReconstructedDocument {
        ReconstructedDocument::new(self.reconstruct(fragments))
    }
}

fn close_line(mut fragments: Vec<TextFragment>) -> Line {
    fragments.sort_by_key(TextFragment::min_x);
    Line { fragments }
}

/// Reconstructed text of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconstructedDocument {
    lines: Vec<String>,
}

impl ReconstructedDocument {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines joined with `\n`.
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.text())
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

/// Counts shown alongside recognised text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    /// Non-whitespace characters.
    pub characters: usize,
    /// Whitespace-separated tokens.
    pub words: usize,
    /// Lines containing something other than whitespace.
    pub lines: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            characters: text.chars().filter(|c| !c.is_whitespace()).count(),
            words: text.split_whitespace().count(),
            lines: text.lines().filter(|l| !l.trim().is_empty()).count(),
        }
    }
}
