#![forbid(unsafe_code)]

//! Core: JSON kinds, parsing with line-aware errors, formatting, bounded tree
//! summaries, graph building, path expressions, and configuration.

pub mod config;
pub mod error;
pub mod format;
pub mod graph;
pub mod logging;
pub mod path;
pub mod tree;
pub mod value;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, trace_span, warn};

pub use config::{AnalysisConfig, ConfigError};
pub use error::{AnalysisError, panic_message};
pub use format::{FormattedDocument, IndentSpec, format_text, format_value};
pub use graph::{GraphEdge, GraphNode, InlineProperty, JsonGraph, NodePosition, build_graph};
pub use path::{ROOT_PATH, select_path};
pub use tree::{TreeNode, TreeSummary, VisitBudget, summarize, summarize_text};
pub use value::{JsonKind, parse_document};
