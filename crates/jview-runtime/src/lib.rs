#![forbid(unsafe_code)]

//! Background analysis for jview.
//!
//! Parsing, formatting and summarizing run off the caller's thread behind a
//! request/response boundary. The pieces, bottom-up:
//!
//! - [`protocol`]: the message schema and its NDJSON codec.
//! - [`worker`]: the receiving side ([`handle_request`], [`serve_lines`]) and
//!   the [`WorkerHandle`] transports.
//! - [`coordinator`]: per-kind request ids; stale responses are dropped.
//! - [`session`]: a worker plus coordinator, keeping the latest results.

pub mod coordinator;
pub mod protocol;
pub mod session;
pub mod worker;

pub use coordinator::{RequestCoordinator, RequestState};
pub use protocol::{
    AnalysisRequest, AnalysisResponse, FormatResponse, ProtocolError, RequestId, RequestKind,
    TreeResponse, decode_request, decode_response, encode_request, encode_response,
};
pub use session::{AnalysisSession, FormatView, TreeView};
pub use worker::{
    Inbound, InlineWorker, ServeStats, StreamWorker, ThreadWorker, TransportError, WorkerHandle,
    handle_request, serve_lines,
};
