#![forbid(unsafe_code)]

//! Command implementations for the `jview` binary.
//!
//! Each command takes the document text and an output writer, so the binary
//! only handles files and process exit codes. Format and tree analysis run
//! through an [`AnalysisSession`] on a background [`ThreadWorker`], exactly
//! as an interactive viewer would drive them.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use tracing::{debug, info};

use jview_core::config::AnalysisConfig;
use jview_core::error::AnalysisError;
use jview_core::format::{FormattedDocument, IndentSpec};
use jview_core::graph::{JsonGraph, build_graph};
use jview_core::tree::TreeSummary;
use jview_core::value::{drop_deep, parse_document};
use jview_layout::{LayeredLayout, LayoutDirection, apply_layout};
use jview_runtime::{AnalysisSession, ThreadWorker, WorkerHandle};
use jview_widgets::syntax::{Rgb, TokenPalette};
use jview_widgets::{TreeOutline, ViewerConfig, render_window, take_columns};

use crate::{Error, Result};

/// How long a command waits for the analysis worker.
pub const ANALYSIS_DEADLINE: Duration = Duration::from_secs(120);

/// Format `source` in the background and return the document.
pub fn analyze_format(
    source: &str,
    indent: IndentSpec,
    config: &AnalysisConfig,
) -> Result<FormattedDocument> {
    let mut session = spawn_session(config)?;
    session.request_format(source, indent)?;
    wait(&mut session)?;
    match session.format_view() {
        Some(view) => view.result.clone().map_err(Error::Analysis),
        None => Err(Error::Analysis(AnalysisError::internal(
            "format analysis produced no result",
        ))),
    }
}

/// Summarize `source` in the background.
pub fn analyze_tree(source: &str, config: &AnalysisConfig) -> Result<TreeSummary> {
    let mut session = spawn_session(config)?;
    session.request_tree(source)?;
    wait(&mut session)?;
    match session.tree_view() {
        Some(view) => view.result.clone().map_err(Error::Analysis),
        None => Err(Error::Analysis(AnalysisError::internal(
            "tree analysis produced no result",
        ))),
    }
}

fn spawn_session(config: &AnalysisConfig) -> Result<AnalysisSession<ThreadWorker>> {
    let worker = ThreadWorker::spawn(*config)?;
    Ok(AnalysisSession::new(worker).with_timeout(ANALYSIS_DEADLINE))
}

fn wait<W: WorkerHandle>(session: &mut AnalysisSession<W>) -> Result<()> {
    let started = Instant::now();
    if session.wait_idle(started + ANALYSIS_DEADLINE)? && has_result(session) {
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "analysis finished");
        Ok(())
    } else {
        Err(Error::Analysis(AnalysisError::internal("analysis timed out")))
    }
}

fn has_result<W: WorkerHandle>(session: &AnalysisSession<W>) -> bool {
    session.format_view().is_some() || session.tree_view().is_some()
}

/// `jview format`
pub fn format<W: Write>(
    source: &str,
    indent: IndentSpec,
    config: &AnalysisConfig,
    out: &mut W,
) -> Result<()> {
    let doc = analyze_format(source, indent, config)?;
    if doc.is_large {
        info!(bytes = doc.byte_size, lines = doc.line_count, "large document");
    }
    for line in &doc.lines {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// `jview tree`
pub fn tree<W: Write>(source: &str, config: &AnalysisConfig, out: &mut W) -> Result<()> {
    let summary = analyze_tree(source, config)?;
    let mut outline = TreeOutline::new(&summary.tree);
    outline.expand_all();
    for line in outline.render_lines() {
        writeln!(out, "{line}")?;
    }
    let note = if summary.truncated { ", truncated" } else { "" };
    writeln!(out, "({} nodes visited{note})", summary.total_nodes_visited)?;
    out.flush()?;
    Ok(())
}

/// Parse, build, and lay out the graph of `source`.
pub fn layout_graph(source: &str, direction: LayoutDirection) -> Result<JsonGraph> {
    let value = parse_document(source)?;
    let mut graph = build_graph(&value);
    drop_deep(value);
    let outcome = apply_layout(&LayeredLayout::new().with_direction(direction), &mut graph);
    if let Some(err) = &outcome.error {
        tracing::warn!(error = %err, "graph shown without layout");
    }
    Ok(graph)
}

/// `jview graph`
pub fn graph<W: Write>(source: &str, direction: LayoutDirection, out: &mut W) -> Result<()> {
    let graph = layout_graph(source, direction)?;
    serde_json::to_writer_pretty(&mut *out, &graph).map_err(io::Error::from)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Terminal geometry and color choice for `view`.
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub offset: usize,
    pub height: usize,
    pub columns: usize,
    pub color: bool,
}

/// `jview view`: the lines a viewport would render at `offset`.
pub fn view<W: Write>(
    source: &str,
    options: ViewOptions,
    analysis: &AnalysisConfig,
    viewer: &ViewerConfig,
    out: &mut W,
) -> Result<()> {
    let doc = analyze_format(source, IndentSpec::default(), analysis)?;
    let window = render_window(&doc.lines, options.offset, options.height, viewer);
    let palette = TokenPalette::for_theme(viewer.light);
    debug!(
        start = window.range.start,
        end = window.range.end,
        total = doc.line_count,
        "rendering window"
    );

    for line in &window.lines {
        let gutter = format!("{:>width$} ", line.number, width = window.gutter_width);
        let mut remaining = options.columns.saturating_sub(gutter.len());
        paint(out, options.color, Some(palette.gutter), &gutter)?;
        for (text, kind) in line.content.segments() {
            let (fitted, used) = take_columns(text, remaining);
            paint(out, options.color, kind.map(|k| palette.color(k)), fitted)?;
            remaining -= used;
            if fitted.len() < text.len() {
                break;
            }
        }
        queue!(out, Print("\n"))?;
    }
    out.flush()?;
    Ok(())
}

fn paint<W: Write>(out: &mut W, color: bool, rgb: Option<Rgb>, text: &str) -> io::Result<()> {
    match rgb.filter(|_| color) {
        Some(Rgb(r, g, b)) => queue!(
            out,
            SetForegroundColor(Color::Rgb { r, g, b }),
            Print(text),
            ResetColor
        ),
        None => queue!(out, Print(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn run<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<()>,
    {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn format_prints_lines() {
        let text = run(|out| {
            format(r#"{"a":1}"#, IndentSpec::Spaces(2), &AnalysisConfig::default(), out)
        });
        assert_eq!(text, "{\n  \"a\": 1\n}\n");
    }

    #[test]
    fn format_reports_syntax_error() {
        let mut out = Vec::new();
        let err = format("{bad json", IndentSpec::default(), &AnalysisConfig::default(), &mut out)
            .unwrap_err();
        let Error::Analysis(err) = err else {
            panic!("expected analysis error");
        };
        assert_eq!(err.line, Some(1));
        assert!(out.is_empty());
    }

    #[test]
    fn tree_prints_outline_and_footer() {
        let config = AnalysisConfig::default().with_max_tree_nodes(3);
        let text = run(|out| tree("[1, 2, 3, 4]", &config, out));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "▾ root [4]");
        assert_eq!(lines[3], "    2 more not shown");
        assert_eq!(lines[4], "(3 nodes visited, truncated)");
    }

    #[test]
    fn graph_is_positioned_json() {
        let text = run(|out| graph(r#"{"x":1,"y":{"z":2}}"#, LayoutDirection::Right, out));
        let value: Value = serde_json::from_str(&text).unwrap();
        let nodes = value["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes.iter().all(|n| n["position"].is_object()));
        assert_eq!(value["edges"][0]["label"], "y");
    }

    #[test]
    fn deep_document_formats_and_graphs() {
        let source = format!("{}{}", "[".repeat(400), "]".repeat(400));
        let text = run(|out| format(&source, IndentSpec::Minified, &AnalysisConfig::default(), out));
        assert_eq!(text.trim_end(), source);
        let graph = layout_graph(&source, LayoutDirection::Down).unwrap();
        assert_eq!(graph.nodes.len(), 400);
    }

    #[test]
    fn view_renders_window_without_color() {
        let source = serde_json::to_string(&(0..100).collect::<Vec<u32>>()).unwrap();
        let options = ViewOptions {
            offset: 0,
            height: 60,
            columns: 80,
            color: false,
        };
        let viewer = ViewerConfig::default();
        let text = run(|out| view(&source, options, &AnalysisConfig::default(), &viewer, out));
        let lines: Vec<&str> = text.lines().collect();
        // ceil(60/20) + 20 overscan
        assert_eq!(lines.len(), 23);
        // 102 lines: three digits plus one
        assert_eq!(lines[0], "   1 [");
        assert_eq!(lines[1], "   2   0,");
    }

    #[test]
    fn view_clips_to_columns() {
        let options = ViewOptions {
            offset: 0,
            height: 20,
            columns: 8,
            color: false,
        };
        let text = run(|out| {
            view(
                r#"{"a_long_key": "a long value"}"#,
                options,
                &AnalysisConfig::default(),
                &ViewerConfig::default(),
                out,
            )
        });
        assert_eq!(text.lines().nth(1), Some("  2   \"a"));
    }
}
