#![forbid(unsafe_code)]

//! jview binary entry point.

use std::io::{self, BufWriter, IsTerminal};
use std::path::Path;
use std::process::ExitCode;

use jview::cli::{self, Command};
use jview::commands::{self, ViewOptions};
use jview::core::config::AnalysisConfig;
use jview::{Error, ViewerConfig, serve_lines};
use tracing::{info, warn};

const DEFAULT_LOG_FILTER: &str = "info";
const FALLBACK_ROWS: usize = 24;
const FALLBACK_COLUMNS: usize = 80;

fn main() -> ExitCode {
    init_logging();

    let command = match cli::parse_args(std::env::args().skip(1)) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("jview: {err}\n\nRun `jview --help` for usage.");
            return ExitCode::from(2);
        }
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Usage(msg)) => {
            eprintln!("jview: {msg}");
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("jview: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "tracing-json")]
fn init_logging() {
    jview::core::logging::init_json_subscriber(DEFAULT_LOG_FILTER);
}

#[cfg(not(feature = "tracing-json"))]
fn init_logging() {
    use jview::core::logging::LOG_ENV;
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn analysis_config() -> AnalysisConfig {
    let parsed = AnalysisConfig::from_env_with_diagnostics();
    for err in &parsed.errors {
        warn!(%err, "ignoring invalid setting");
    }
    parsed.config
}

fn viewer_config() -> ViewerConfig {
    let parsed = ViewerConfig::from_env_with_diagnostics();
    for err in &parsed.errors {
        warn!(%err, "ignoring invalid setting");
    }
    parsed.config
}

fn read_source(path: &Path) -> jview::Result<String> {
    let source = std::fs::read_to_string(path).map_err(|err| {
        Error::Io(io::Error::new(
            err.kind(),
            format!("{}: {err}", path.display()),
        ))
    })?;
    info!(path = %path.display(), bytes = source.len(), "loaded document");
    Ok(source)
}

fn run(command: Command) -> jview::Result<()> {
    let stdout = io::stdout();
    match command {
        Command::Help => {
            println!("{}", cli::HELP_TEXT);
            Ok(())
        }
        Command::Version => {
            println!("jview {}", cli::VERSION);
            Ok(())
        }
        Command::Format { path, indent } => {
            let source = read_source(&path)?;
            let mut out = BufWriter::new(stdout.lock());
            commands::format(&source, indent, &analysis_config(), &mut out)
        }
        Command::Tree { path, max_nodes } => {
            let source = read_source(&path)?;
            let mut config = analysis_config();
            if let Some(max) = max_nodes {
                config = config.with_max_tree_nodes(max);
            }
            let mut out = BufWriter::new(stdout.lock());
            commands::tree(&source, &config, &mut out)
        }
        Command::Graph { path, direction } => {
            let source = read_source(&path)?;
            let mut out = BufWriter::new(stdout.lock());
            commands::graph(&source, direction, &mut out)
        }
        Command::View {
            path,
            offset,
            height,
            light,
        } => {
            let source = read_source(&path)?;
            let mut viewer = viewer_config();
            if let Some(light) = light {
                viewer = viewer.with_light(light);
            }
            let color = stdout.is_terminal();
            let (columns, rows) = crossterm::terminal::size()
                .map(|(c, r)| (usize::from(c), usize::from(r)))
                .unwrap_or((FALLBACK_COLUMNS, FALLBACK_ROWS));
            let options = ViewOptions {
                offset,
                height: height.unwrap_or(rows * viewer.line_height),
                columns,
                color,
            };
            let mut out = BufWriter::new(stdout.lock());
            commands::view(&source, options, &analysis_config(), &viewer, &mut out)
        }
        Command::Serve => {
            let stats = serve_lines(io::stdin().lock(), stdout.lock(), &analysis_config())?;
            info!(
                handled = stats.handled,
                rejected = stats.rejected,
                "analysis worker finished"
            );
            Ok(())
        }
    }
}
