#![forbid(unsafe_code)]

//! Viewer building blocks for jview.
//!
//! Nothing here owns a terminal or a window. Each piece computes what a host
//! should draw:
//!
//! - [`virtualized`]: visible line range, scroll extent, and the highlighted
//!   window of lines for one frame.
//! - [`syntax`]: line-local JSON token coloring and palettes.
//! - [`coalesce`]: one scroll recompute per frame, latest offset wins.
//! - [`tree_outline`]: expandable rows over a bounded tree summary.

pub mod coalesce;
pub mod config;
pub mod syntax;
pub mod tree_outline;
pub mod virtualized;

pub use coalesce::ScrollCoalescer;
pub use config::ViewerConfig;
pub use syntax::{HighlightedLine, Rgb, TokenKind, TokenPalette, highlight_line};
pub use tree_outline::{OutlineEntry, OutlineRow, TreeOutline};
pub use virtualized::{
    LineViewport, RenderWindow, RenderedLine, ScrollState, gutter_width, render_window,
    take_columns,
};
