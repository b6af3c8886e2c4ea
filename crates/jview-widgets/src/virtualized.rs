#![forbid(unsafe_code)]

//! Virtualized rendering of pre-split lines.
//!
//! Only the lines intersecting the viewport, plus `overscan` lines on each
//! side, are ever materialized. The full scroll extent is reserved with
//! [`LineViewport::total_height`] and the rendered block is placed at
//! [`LineViewport::window_top`], so the scrollbar behaves as if every line
//! were present.
//!
//! Offsets and heights are in the same unit as `line_height` (pixels in a
//! graphical host, rows in a terminal with `line_height = 1`).
//!
//! # Invariants
//!
//! - Every line whose extent intersects `[offset, offset + height)` lies in
//!   [`LineViewport::visible_range`].
//! - `visible_range` never exceeds `0..line_count`, and `start <= end`.
//! - Rendering cost is bounded by the range length, not the document size.

use std::ops::Range;

use unicode_width::UnicodeWidthChar;

use crate::config::ViewerConfig;
use crate::syntax::{HighlightedLine, highlight_line};

/// Geometry of a fixed-height line list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineViewport {
    line_count: usize,
    line_height: usize,
    overscan: usize,
}

impl LineViewport {
    /// A zero `line_height` is treated as 1.
    #[must_use]
    pub fn new(line_count: usize, line_height: usize, overscan: usize) -> Self {
        Self {
            line_count,
            line_height: line_height.max(1),
            overscan,
        }
    }

    #[must_use]
    pub fn from_config(line_count: usize, config: &ViewerConfig) -> Self {
        Self::new(line_count, config.line_height, config.overscan)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    #[must_use]
    pub fn line_height(&self) -> usize {
        self.line_height
    }

    #[must_use]
    pub fn overscan(&self) -> usize {
        self.overscan
    }

    /// Scroll extent reserved for the whole document.
    #[must_use]
    pub fn total_height(&self) -> usize {
        self.line_count.saturating_mul(self.line_height)
    }

    /// Lines to render for a viewport of `height` scrolled to `offset`.
    #[must_use]
    pub fn visible_range(&self, offset: usize, height: usize) -> Range<usize> {
        let first = offset / self.line_height;
        let last = offset.saturating_add(height).div_ceil(self.line_height);
        let end = last.saturating_add(self.overscan).min(self.line_count);
        let start = first.saturating_sub(self.overscan).min(end);
        start..end
    }

    /// Offset at which the rendered block starts.
    #[must_use]
    pub fn window_top(&self, range: &Range<usize>) -> usize {
        range.start.saturating_mul(self.line_height)
    }

    /// Largest offset that still shows content at the top of the viewport.
    #[must_use]
    pub fn max_offset(&self, height: usize) -> usize {
        self.total_height().saturating_sub(height)
    }
}

/// Columns for the line-number gutter: `max(3, digits + 1)`.
#[must_use]
pub fn gutter_width(line_count: usize) -> usize {
    let digits = line_count.checked_ilog10().map_or(1, |d| d as usize + 1);
    (digits + 1).max(3)
}

/// Longest prefix of `text` that fits in `columns` terminal cells, and its width.
///
/// A wide character that would straddle the limit is left out.
#[must_use]
pub fn take_columns(text: &str, columns: usize) -> (&str, usize) {
    let mut used = 0;
    for (index, ch) in text.char_indices() {
        let width = ch.width().unwrap_or(0);
        if used + width > columns {
            return (&text[..index], used);
        }
        used += width;
    }
    (text, used)
}

/// One line of a rendered window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine<'a> {
    /// 1-based line number.
    pub number: usize,
    pub content: HighlightedLine<'a>,
}

/// The materialized slice of a document for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderWindow<'a> {
    pub range: Range<usize>,
    pub top: usize,
    pub total_height: usize,
    pub gutter_width: usize,
    pub lines: Vec<RenderedLine<'a>>,
}

/// Highlight just the lines in view.
pub fn render_window<'a, S>(
    lines: &'a [S],
    offset: usize,
    height: usize,
    config: &ViewerConfig,
) -> RenderWindow<'a>
where
    S: AsRef<str>,
{
    let viewport = LineViewport::from_config(lines.len(), config);
    let range = viewport.visible_range(offset, height);

    #[cfg(feature = "tracing")]
    let _span = tracing::debug_span!(
        "render_window",
        offset,
        height,
        start = range.start,
        end = range.end,
        total = lines.len()
    )
    .entered();

    let rendered = lines[range.clone()]
        .iter()
        .zip(range.clone())
        .map(|(line, index)| RenderedLine {
            number: index + 1,
            content: highlight_line(line.as_ref(), config.max_highlight_chars),
        })
        .collect();

    RenderWindow {
        top: viewport.window_top(&range),
        total_height: viewport.total_height(),
        gutter_width: gutter_width(lines.len()),
        range,
        lines: rendered,
    }
}

/// Scroll position clamped to a content extent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollState {
    offset: usize,
    viewport_height: usize,
    content_height: usize,
}

impl ScrollState {
    #[must_use]
    pub fn new(viewport_height: usize, content_height: usize) -> Self {
        Self {
            offset: 0,
            viewport_height,
            content_height,
        }
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub fn viewport_height(&self) -> usize {
        self.viewport_height
    }

    #[must_use]
    pub fn max_offset(&self) -> usize {
        self.content_height.saturating_sub(self.viewport_height)
    }

    /// Update extents (resize or new document) and re-clamp.
    pub fn set_extent(&mut self, viewport_height: usize, content_height: usize) {
        self.viewport_height = viewport_height;
        self.content_height = content_height;
        self.clamp();
    }

    pub fn clamp(&mut self) {
        self.offset = self.offset.min(self.max_offset());
    }

    pub fn scroll_to(&mut self, offset: usize) {
        self.offset = offset.min(self.max_offset());
    }

    /// Scroll by `delta` (positive = down).
    pub fn scroll_by(&mut self, delta: isize) {
        let target = if delta < 0 {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta.unsigned_abs())
        };
        self.scroll_to(target);
    }

    pub fn page_up(&mut self) {
        self.offset = self.offset.saturating_sub(self.viewport_height);
    }

    pub fn page_down(&mut self) {
        self.scroll_to(self.offset.saturating_add(self.viewport_height));
    }

    pub fn scroll_to_top(&mut self) {
        self.offset = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.offset = self.max_offset();
    }

    #[must_use]
    pub fn is_at_bottom(&self) -> bool {
        self.offset >= self.max_offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("\"line\": {i},")).collect()
    }

    #[test]
    fn range_at_top() {
        let viewport = LineViewport::new(10_000, 20, 20);
        assert_eq!(viewport.visible_range(0, 800), 0..60);
    }

    #[test]
    fn range_mid_document() {
        let viewport = LineViewport::new(10_000, 20, 20);
        // floor(2010/20)=100, ceil(2810/20)=141
        assert_eq!(viewport.visible_range(2010, 800), 80..161);
        assert_eq!(viewport.window_top(&(80..161)), 1600);
    }

    #[test]
    fn range_clamped_at_end() {
        let viewport = LineViewport::new(100, 20, 20);
        assert_eq!(viewport.visible_range(1800, 800), 70..100);
        assert_eq!(viewport.visible_range(1_000_000, 800), 100..100);
    }

    #[test]
    fn empty_document() {
        let viewport = LineViewport::new(0, 20, 20);
        assert_eq!(viewport.visible_range(0, 800), 0..0);
        assert_eq!(viewport.total_height(), 0);
    }

    #[test]
    fn total_height_reserves_all_lines() {
        assert_eq!(LineViewport::new(10_000, 20, 20).total_height(), 200_000);
    }

    #[test]
    fn gutter_widths() {
        assert_eq!(gutter_width(0), 3);
        assert_eq!(gutter_width(9), 3);
        assert_eq!(gutter_width(99), 3);
        assert_eq!(gutter_width(100), 4);
        assert_eq!(gutter_width(10_000), 6);
    }

    #[test]
    fn render_window_numbers_and_highlights() {
        let doc = lines(1000);
        let config = ViewerConfig::default();
        let window = render_window(&doc, 400, 100, &config);
        // floor(400/20)=20 minus 20 overscan, ceil(500/20)=25 plus 20
        assert_eq!(window.range, 0..45);
        assert_eq!(window.top, 0);
        assert_eq!(window.total_height, 20_000);
        assert_eq!(window.gutter_width, 5);
        assert_eq!(window.lines.len(), 45);
        assert_eq!(window.lines[0].number, 1);
        assert_eq!(window.lines[44].number, 45);

        let later = render_window(&doc, 10_000, 100, &config);
        assert_eq!(later.range, 480..525);
        assert_eq!(later.top, 9600);
        assert_eq!(later.lines[0].number, 481);
        assert!(!window.lines[3].content.spans.is_empty());
    }

    #[test]
    fn take_columns_respects_wide_chars() {
        assert_eq!(take_columns("abcdef", 4), ("abcd", 4));
        assert_eq!(take_columns("ab", 10), ("ab", 2));
        assert_eq!(take_columns("a日本", 4), ("a日", 3));
        assert_eq!(take_columns("日本", 0), ("", 0));
    }

    #[test]
    fn scroll_state_clamps() {
        let mut scroll = ScrollState::new(100, 1000);
        scroll.scroll_by(-5);
        assert_eq!(scroll.offset(), 0);
        scroll.scroll_by(950);
        assert_eq!(scroll.offset(), 900);
        assert!(scroll.is_at_bottom());
        scroll.page_up();
        assert_eq!(scroll.offset(), 800);
        scroll.page_down();
        scroll.page_down();
        assert_eq!(scroll.offset(), 900);
        scroll.set_extent(100, 300);
        assert_eq!(scroll.offset(), 200);
        scroll.scroll_to_top();
        assert_eq!(scroll.offset(), 0);
    }

    #[test]
    fn short_content_never_scrolls() {
        let mut scroll = ScrollState::new(500, 100);
        scroll.page_down();
        scroll.scroll_to_bottom();
        assert_eq!(scroll.offset(), 0);
    }
}
