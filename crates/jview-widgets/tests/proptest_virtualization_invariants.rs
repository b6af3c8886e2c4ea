//! Property-based invariant tests for virtualized rendering.
//!
//! 1. Every line intersecting the viewport is inside the visible range.
//! 2. The range stays within `0..line_count` and `start <= end`.
//! 3. The rendered window holds exactly the range, numbered from 1.
//! 4. Highlight spans cover the display text with no gaps or overlaps.
//! 5. Scroll state never leaves `0..=max_offset`.
//! 6. The coalescer always delivers the last pushed offset.

use jview_widgets::config::ViewerConfig;
use jview_widgets::{
    LineViewport, ScrollCoalescer, ScrollState, highlight_line, render_window, take_columns,
};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn viewport_strategy() -> impl Strategy<Value = (usize, usize, usize)> {
    (0usize..50_000, 1usize..64, 0usize..64)
}

fn json_line() -> impl Strategy<Value = String> {
    prop_oneof![
        r#" {0,8}"[a-z\\"]{0,6}": -?[0-9]{1,6},?"#,
        r#" {0,8}"[a-z ]{0,12}",?"#,
        " {0,8}(true|false|null),?",
        " {0,8}[\\[\\]{}],?",
        ".{0,80}",
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1-2. Range completeness and bounds
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn intersecting_lines_are_visible(
        (count, line_height, overscan) in viewport_strategy(),
        offset in 0usize..2_000_000,
        height in 0usize..4_000,
    ) {
        let viewport = LineViewport::new(count, line_height, overscan);
        let range = viewport.visible_range(offset, height);
        prop_assert!(range.start <= range.end);
        prop_assert!(range.end <= count);

        let first = offset / line_height;
        let last = (offset + height).div_ceil(line_height).min(count);
        for line in first.min(count)..last {
            prop_assert!(range.contains(&line), "line {} missing from {:?}", line, range);
        }
    }

    #[test]
    fn window_top_matches_range(
        (count, line_height, overscan) in viewport_strategy(),
        offset in 0usize..2_000_000,
    ) {
        let viewport = LineViewport::new(count, line_height, overscan);
        let range = viewport.visible_range(offset, 800);
        prop_assert_eq!(viewport.window_top(&range), range.start * line_height);
        prop_assert_eq!(viewport.total_height(), count * line_height);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3-4. Rendered window and highlighting
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn window_holds_exactly_the_range(
        lines in prop::collection::vec(json_line(), 0..300),
        offset in 0usize..8_000,
        height in 0usize..1_000,
    ) {
        let config = ViewerConfig::default();
        let window = render_window(&lines, offset, height, &config);
        prop_assert_eq!(window.lines.len(), window.range.len());
        for (rendered, index) in window.lines.iter().zip(window.range.clone()) {
            prop_assert_eq!(rendered.number, index + 1);
        }
    }

    #[test]
    fn spans_tile_display(line in json_line(), cap in 1usize..120) {
        let highlighted = highlight_line(&line, cap);
        let mut cursor = 0;
        for span in &highlighted.spans {
            prop_assert_eq!(span.range.start, cursor);
            prop_assert!(span.range.end > span.range.start);
            cursor = span.range.end;
        }
        prop_assert_eq!(cursor, highlighted.display.len());
        prop_assert!(highlighted.display.chars().count() <= cap + 2);
    }

    #[test]
    fn take_columns_is_a_prefix(text in ".{0,40}", columns in 0usize..50) {
        let (prefix, used) = take_columns(&text, columns);
        prop_assert!(text.starts_with(prefix));
        prop_assert!(used <= columns);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5-6. Scrolling
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn scroll_stays_in_bounds(
        viewport in 0usize..2_000,
        content in 0usize..100_000,
        deltas in prop::collection::vec(-5_000isize..5_000, 0..40),
    ) {
        let mut scroll = ScrollState::new(viewport, content);
        for delta in deltas {
            match delta.rem_euclid(4) {
                0 => scroll.page_down(),
                1 => scroll.page_up(),
                _ => scroll.scroll_by(delta),
            }
            prop_assert!(scroll.offset() <= scroll.max_offset());
        }
    }

    #[test]
    fn coalescer_delivers_last(offsets in prop::collection::vec(any::<usize>(), 1..50)) {
        let mut coalescer = ScrollCoalescer::new();
        for &offset in &offsets {
            coalescer.push(offset);
        }
        prop_assert_eq!(coalescer.flush(), offsets.last().copied());
        prop_assert_eq!(coalescer.coalesced(), offsets.len() as u64 - 1);
        prop_assert!(!coalescer.has_pending());
    }
}
