#![forbid(unsafe_code)]

//! Command-line argument parsing for the `jview` binary.
//!
//! Parses args manually (no external dependencies). Analysis and viewer
//! defaults come from the `JVIEW_*` environment variables; explicit flags
//! override them.

use std::path::PathBuf;

use jview_core::format::IndentSpec;
use jview_layout::LayoutDirection;

use crate::Error;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HELP_TEXT: &str = "\
jview: browse, format, and explore large JSON documents

USAGE:
    jview <COMMAND> [FILE] [OPTIONS]

COMMANDS:
    format FILE     Pretty-print or minify a document
    tree   FILE     Print a bounded structural outline
    graph  FILE     Emit the laid-out node/edge graph as JSON
    view   FILE     Print the highlighted lines visible at a scroll offset
    serve           Run an analysis worker on stdin/stdout (one JSON message per line)

OPTIONS:
    --indent=N           Indent width for `format`, 1-10 (default: 2)
    --minify             Minified output for `format`
    --max-nodes=N        Node budget for `tree` (default: 5000)
    --direction=DIR      Layout direction for `graph`: right (default) or down
    --offset=PX          Scroll offset for `view` (default: 0)
    --height=PX          Viewport height for `view` (default: terminal height)
    --light              Light palette for `view`
    --help, -h           Show this help message
    --version, -V        Show version

ENVIRONMENT VARIABLES:
    JVIEW_LOG                    Log filter (default: info)
    JVIEW_LARGE_FILE_THRESHOLD   Bytes above which output is flagged large
    JVIEW_MAX_TREE_NODES         Default --max-nodes
    JVIEW_MAX_STRING_PREVIEW     Characters kept of long strings in `tree`
    JVIEW_LINE_HEIGHT            Pixels per line in `view` (default: 20)
    JVIEW_OVERSCAN               Extra lines rendered around the viewport
    JVIEW_MAX_HIGHLIGHT_CHARS    Long lines are cut to this for coloring
    JVIEW_LIGHT                  Default for --light";

/// A parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Format {
        path: PathBuf,
        indent: IndentSpec,
    },
    Tree {
        path: PathBuf,
        max_nodes: Option<usize>,
    },
    Graph {
        path: PathBuf,
        direction: LayoutDirection,
    },
    View {
        path: PathBuf,
        offset: usize,
        height: Option<usize>,
        light: Option<bool>,
    },
    Serve,
    Help,
    Version,
}

/// Parse `args` (without the program name).
pub fn parse_args<I, S>(args: I) -> Result<Command, Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        return Ok(Command::Help);
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        return Ok(Command::Version);
    }

    let mut positional = Vec::new();
    let mut flags = Vec::new();
    for arg in &args {
        if arg.starts_with("--") {
            flags.push(arg.as_str());
        } else {
            positional.push(arg.as_str());
        }
    }

    let Some((&name, rest)) = positional.split_first() else {
        return Err(usage("missing command"));
    };

    let mut command = match name {
        "serve" => {
            if !rest.is_empty() {
                return Err(usage("serve takes no file"));
            }
            Command::Serve
        }
        "format" => Command::Format {
            path: single_path(name, rest)?,
            indent: IndentSpec::default(),
        },
        "tree" => Command::Tree {
            path: single_path(name, rest)?,
            max_nodes: None,
        },
        "graph" => Command::Graph {
            path: single_path(name, rest)?,
            direction: LayoutDirection::default(),
        },
        "view" => Command::View {
            path: single_path(name, rest)?,
            offset: 0,
            height: None,
            light: None,
        },
        other => return Err(usage(format!("unknown command: {other}"))),
    };

    for flag in flags {
        apply_flag(&mut command, flag)?;
    }
    Ok(command)
}

fn single_path(command: &str, rest: &[&str]) -> Result<PathBuf, Error> {
    match rest {
        [path] => Ok(PathBuf::from(path)),
        [] => Err(usage(format!("{command} needs a FILE"))),
        _ => Err(usage(format!("{command} takes exactly one FILE"))),
    }
}

fn apply_flag(command: &mut Command, flag: &str) -> Result<(), Error> {
    let (name, value) = match flag.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (flag, None),
    };

    match (command, name, value) {
        (Command::Format { indent, .. }, "--indent", Some(v)) => {
            let width: u64 = parse_number(name, v)?;
            if !(1..=10).contains(&width) {
                return Err(usage(format!("--indent must be 1-10, got {v}")));
            }
            *indent = IndentSpec::spaces(width);
        }
        (Command::Format { indent, .. }, "--minify", None) => *indent = IndentSpec::Minified,
        (Command::Tree { max_nodes, .. }, "--max-nodes", Some(v)) => {
            let max: usize = parse_number(name, v)?;
            if max == 0 {
                return Err(usage("--max-nodes must be >= 1"));
            }
            *max_nodes = Some(max);
        }
        (Command::Graph { direction, .. }, "--direction", Some(v)) => {
            *direction = LayoutDirection::parse(v)
                .ok_or_else(|| usage(format!("invalid --direction value: {v}")))?;
        }
        (Command::View { offset, .. }, "--offset", Some(v)) => *offset = parse_number(name, v)?,
        (Command::View { height, .. }, "--height", Some(v)) => {
            *height = Some(parse_number(name, v)?);
        }
        (Command::View { light, .. }, "--light", None) => *light = Some(true),
        _ => return Err(usage(format!("unexpected argument: {flag}"))),
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, Error> {
    value
        .trim()
        .parse()
        .map_err(|_| usage(format!("invalid {flag} value: {value}")))
}

fn usage(message: impl Into<String>) -> Error {
    Error::Usage(message.into())
}
