#![forbid(unsafe_code)]

//! jview public facade crate.
//!
//! Re-exports the analysis, layout, runtime, and viewer crates behind one
//! dependency, with a prelude for day-to-day use and a top-level error type
//! for applications. The `jview` binary is built on the [`cli`] and
//! [`commands`] modules.

use std::fmt;

pub mod cli;
pub mod commands;

// --- Core re-exports -------------------------------------------------------

pub use jview_core::{
    AnalysisConfig, AnalysisError, FormattedDocument, IndentSpec, JsonGraph, JsonKind, TreeNode,
    TreeSummary, build_graph, format_text, parse_document, select_path, summarize,
    summarize_text,
};

// --- Layout re-exports -----------------------------------------------------

pub use jview_layout::{
    LayeredLayout, LayoutDirection, LayoutEngine, LayoutOutcome, apply_layout,
    layout_or_degenerate,
};

// --- Runtime re-exports ----------------------------------------------------

pub use jview_runtime::{
    AnalysisRequest, AnalysisResponse, AnalysisSession, InlineWorker, RequestCoordinator,
    RequestKind, ThreadWorker, TransportError, WorkerHandle, serve_lines,
};

// --- Widget re-exports -----------------------------------------------------

pub use jview_widgets::{
    LineViewport, ScrollCoalescer, ScrollState, TokenPalette, TreeOutline, ViewerConfig,
    render_window,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for jview applications.
#[derive(Debug)]
pub enum Error {
    /// Reading input or writing output failed.
    Io(std::io::Error),
    /// The document could not be analyzed.
    Analysis(AnalysisError),
    /// The analysis worker is unreachable.
    Transport(TransportError),
    /// Bad command-line usage.
    Usage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Analysis(err) => write!(f, "{err}"),
            Self::Transport(err) => write!(f, "{err}"),
            Self::Usage(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Analysis(err) => Some(err),
            Self::Transport(err) => Some(err),
            Self::Usage(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<AnalysisError> for Error {
    fn from(err: AnalysisError) -> Self {
        Self::Analysis(err)
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

/// Standard result type for jview APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        AnalysisConfig, AnalysisSession, Error, IndentSpec, LayeredLayout, Result, ThreadWorker,
        TreeOutline, ViewerConfig, WorkerHandle,
    };

    pub use crate::{core, layout, runtime, widgets};
}

pub use jview_core as core;
pub use jview_layout as layout;
pub use jview_runtime as runtime;
pub use jview_widgets as widgets;
