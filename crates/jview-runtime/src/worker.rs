#![forbid(unsafe_code)]

//! Analysis workers.
//!
//! [`handle_request`] is the receiving side of the protocol: it answers every
//! request exactly once, with the request's id, and converts panics into
//! `ok: false` responses so that one bad request never takes the worker
//! down. It keeps no state between requests.
//!
//! Three transports implement [`WorkerHandle`]:
//!
//! - [`ThreadWorker`]: one named background thread, FIFO, channels both ways.
//! - [`InlineWorker`]: deferred tasks run on the caller's thread when polled.
//! - [`StreamWorker`]: NDJSON over a byte stream (e.g. a child process's
//!   stdin/stdout), with a reader thread decoding responses. The other end is
//!   [`serve_lines`].

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, BufRead, Write};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use jview_core::config::AnalysisConfig;
use jview_core::error::AnalysisError;
use jview_core::format::format_text;
use jview_core::panic_message;
use jview_core::tree::summarize_text;
use tracing::{debug, trace, warn};

use crate::protocol::{
    AnalysisRequest, AnalysisResponse, FormatResponse, ProtocolError, RequestKind, TreeResponse,
    decode_request, decode_response, encode_request, encode_response,
};

/// Name of the [`ThreadWorker`] thread.
pub const WORKER_THREAD_NAME: &str = "jview-analysis";

/// Run one request to completion.
#[must_use]
pub fn handle_request(request: &AnalysisRequest, config: &AnalysisConfig) -> AnalysisResponse {
    let _span = tracing::debug_span!(
        "handle_request",
        id = request.id,
        kind = %request.kind,
        bytes = request.source_text.len()
    )
    .entered();

    let outcome = catch_unwind(AssertUnwindSafe(|| match request.kind {
        RequestKind::Format => AnalysisResponse::Format(FormatResponse {
            id: request.id,
            result: format_text(
                &request.source_text,
                request.indent.unwrap_or_default(),
                config,
            ),
        }),
        RequestKind::Tree => AnalysisResponse::Tree(TreeResponse {
            id: request.id,
            result: summarize_text(&request.source_text, config),
        }),
    }));

    match outcome {
        Ok(response) => {
            debug!(ok = response.is_ok(), "request handled");
            response
        }
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            warn!(panic = %msg, "analysis panicked");
            AnalysisResponse::failure(
                request.id,
                request.kind,
                AnalysisError::internal(format!("internal error: {msg}")),
            )
        }
    }
}

/// What a transport hands back: a response, or a message it could not read.
pub type Inbound = Result<AnalysisResponse, ProtocolError>;

/// The analysis side is unreachable.
#[derive(Debug)]
pub enum TransportError {
    /// The worker has shut down or its channel closed.
    Closed,
    /// The worker thread could not be started.
    Spawn(io::Error),
    /// Writing to the stream failed.
    Io(io::Error),
    /// An outbound request could not be encoded.
    Protocol(ProtocolError),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => f.write_str("analysis worker closed"),
            Self::Spawn(err) => write!(f, "cannot start analysis worker: {err}"),
            Self::Io(err) => write!(f, "analysis stream error: {err}"),
            Self::Protocol(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(err) | Self::Io(err) => Some(err),
            Self::Protocol(err) => Some(err),
            Self::Closed => None,
        }
    }
}

/// Client side of a request/response channel to an analysis context.
pub trait WorkerHandle {
    /// Send a request. Never blocks on the analysis itself.
    fn post(&mut self, request: AnalysisRequest) -> Result<(), TransportError>;

    /// Everything that has arrived so far, without blocking.
    fn drain(&mut self) -> Result<Vec<Inbound>, TransportError>;

    /// Wait up to `timeout` for the next message.
    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, TransportError>;
}

// ── Thread worker ────────────────────────────────────────────────────

enum WorkerCommand {
    Analyze(AnalysisRequest),
    Shutdown,
}

/// A dedicated analysis thread. Requests run one at a time in FIFO order.
pub struct ThreadWorker {
    sender: mpsc::Sender<WorkerCommand>,
    responses: mpsc::Receiver<AnalysisResponse>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadWorker {
    pub fn spawn(config: AnalysisConfig) -> Result<Self, TransportError> {
        let (tx, rx) = mpsc::channel::<WorkerCommand>();
        let (response_tx, response_rx) = mpsc::channel::<AnalysisResponse>();
        let stop = Arc::new(AtomicBool::new(false));
        let loop_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || worker_loop(config, rx, response_tx, &loop_stop))
            .map_err(TransportError::Spawn)?;

        Ok(Self {
            sender: tx,
            responses: response_rx,
            stop,
            handle: Some(handle),
        })
    }

    /// Stop accepting work and join the thread once the current request ends.
    ///
    /// Requests still queued are skipped, not run.
    pub fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        let _ = self.sender.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            if let Err(payload) = handle.join() {
                tracing::error!(panic = %panic_message(payload.as_ref()), "analysis thread panicked");
            }
        }
    }
}

impl Drop for ThreadWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(
    config: AnalysisConfig,
    rx: mpsc::Receiver<WorkerCommand>,
    responses: mpsc::Sender<AnalysisResponse>,
    stop: &AtomicBool,
) {
    debug!("analysis thread started");
    for command in rx {
        if stop.load(Ordering::Acquire) {
            debug!("analysis thread stopping");
            break;
        }
        match command {
            WorkerCommand::Analyze(request) => {
                if responses.send(handle_request(&request, &config)).is_err() {
                    break;
                }
            }
            WorkerCommand::Shutdown => break,
        }
    }
    debug!("analysis thread stopped");
}

impl WorkerHandle for ThreadWorker {
    fn post(&mut self, request: AnalysisRequest) -> Result<(), TransportError> {
        self.sender
            .send(WorkerCommand::Analyze(request))
            .map_err(|_| TransportError::Closed)
    }

    fn drain(&mut self) -> Result<Vec<Inbound>, TransportError> {
        let mut out = Vec::new();
        loop {
            match self.responses.try_recv() {
                Ok(response) => out.push(Ok(response)),
                Err(TryRecvError::Empty) => return Ok(out),
                Err(TryRecvError::Disconnected) if out.is_empty() => {
                    return Err(TransportError::Closed);
                }
                Err(TryRecvError::Disconnected) => return Ok(out),
            }
        }
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, TransportError> {
        match self.responses.recv_timeout(timeout) {
            Ok(response) => Ok(Some(Ok(response))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

// ── Inline worker ────────────────────────────────────────────────────

/// Deferred analysis on the caller's thread.
///
/// `post` only queues; queued requests run when the worker is polled.
#[derive(Debug, Default)]
pub struct InlineWorker {
    config: AnalysisConfig,
    queue: VecDeque<AnalysisRequest>,
}

impl InlineWorker {
    #[must_use]
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
        }
    }

    /// Requests queued but not yet run.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl WorkerHandle for InlineWorker {
    fn post(&mut self, request: AnalysisRequest) -> Result<(), TransportError> {
        self.queue.push_back(request);
        Ok(())
    }

    fn drain(&mut self) -> Result<Vec<Inbound>, TransportError> {
        Ok(self
            .queue
            .drain(..)
            .map(|request| Ok(handle_request(&request, &self.config)))
            .collect())
    }

    fn recv_timeout(&mut self, _timeout: Duration) -> Result<Option<Inbound>, TransportError> {
        Ok(self
            .queue
            .pop_front()
            .map(|request| Ok(handle_request(&request, &self.config))))
    }
}

// ── Stream worker ────────────────────────────────────────────────────

/// NDJSON client over a byte stream.
///
/// Requests are written to `writer` one per line; a background thread reads
/// `reader` line by line and decodes each into an [`Inbound`]. Lines that do
/// not decode come back as `Err(ProtocolError)` for the caller to reject.
pub struct StreamWorker<W: Write> {
    writer: W,
    inbound: mpsc::Receiver<Inbound>,
    reader: Option<JoinHandle<()>>,
}

impl<W: Write> StreamWorker<W> {
    pub fn spawn<R>(reader: R, writer: W) -> Result<Self, TransportError>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Inbound>();
        let handle = thread::Builder::new()
            .name("jview-stream-reader".into())
            .spawn(move || read_responses(reader, tx))
            .map_err(TransportError::Spawn)?;
        Ok(Self {
            writer,
            inbound: rx,
            reader: Some(handle),
        })
    }

    /// Whether the reader thread has hit end of stream.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.reader.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

fn read_responses<R: BufRead>(reader: R, tx: mpsc::Sender<Inbound>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "analysis stream read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        if tx.send(decode_response(&line)).is_err() {
            break;
        }
    }
    trace!("analysis stream reader finished");
}

impl<W: Write> WorkerHandle for StreamWorker<W> {
    fn post(&mut self, request: AnalysisRequest) -> Result<(), TransportError> {
        let line = encode_request(&request).map_err(TransportError::Protocol)?;
        self.writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.write_all(b"\n"))
            .and_then(|()| self.writer.flush())
            .map_err(TransportError::Io)
    }

    fn drain(&mut self) -> Result<Vec<Inbound>, TransportError> {
        let mut out = Vec::new();
        loop {
            match self.inbound.try_recv() {
                Ok(message) => out.push(message),
                Err(TryRecvError::Empty) => return Ok(out),
                Err(TryRecvError::Disconnected) if out.is_empty() => {
                    return Err(TransportError::Closed);
                }
                Err(TryRecvError::Disconnected) => return Ok(out),
            }
        }
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Inbound>, TransportError> {
        match self.inbound.recv_timeout(timeout) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }
}

// ── Serving side ─────────────────────────────────────────────────────

/// Counters from one [`serve_lines`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub handled: usize,
    pub rejected: usize,
}

/// Worker loop for a separate process: one request per input line, one
/// response per output line, until end of input.
///
/// Lines that are not valid requests get no reply; they are logged and
/// counted in [`ServeStats::rejected`].
pub fn serve_lines<R, W>(reader: R, mut writer: W, config: &AnalysisConfig) -> io::Result<ServeStats>
where
    R: BufRead,
    W: Write,
{
    let mut stats = ServeStats::default();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request = match decode_request(&line) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "dropping malformed request");
                stats.rejected += 1;
                continue;
            }
        };
        let response = handle_request(&request, config);
        match encode_response(&response) {
            Ok(encoded) => {
                writer.write_all(encoded.as_bytes())?;
                writer.write_all(b"\n")?;
                writer.flush()?;
                stats.handled += 1;
            }
            Err(err) => {
                tracing::error!(id = request.id, error = %err, "cannot encode response");
                stats.rejected += 1;
            }
        }
    }
    debug!(handled = stats.handled, rejected = stats.rejected, "serve loop finished");
    Ok(stats)
}
