#![forbid(unsafe_code)]

//! An analysis session: one worker, one coordinator, and the last published
//! result of each kind.
//!
//! The caller drives it from its own loop. [`AnalysisSession::pump`] never
//! blocks; it drains whatever the worker has produced, publishes responses
//! that answer the latest request, and expires requests older than the
//! configured timeout.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use jview_core::error::AnalysisError;
use jview_core::format::{FormattedDocument, IndentSpec};
use jview_core::tree::TreeSummary;

use crate::coordinator::RequestCoordinator;
use crate::protocol::{AnalysisResponse, RequestId, RequestKind};
use crate::worker::{TransportError, WorkerHandle};

/// Last published format result.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatView {
    pub request_id: RequestId,
    pub result: Result<FormattedDocument, AnalysisError>,
}

/// Last published tree result.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeView {
    pub request_id: RequestId,
    pub result: Result<TreeSummary, AnalysisError>,
}

/// Owns a worker and publishes only the latest result per kind.
pub struct AnalysisSession<W: WorkerHandle> {
    worker: W,
    coordinator: RequestCoordinator,
    timeout: Option<Duration>,
    started: [Option<Instant>; RequestKind::ALL.len()],
    format: Option<FormatView>,
    tree: Option<TreeView>,
}

impl<W: WorkerHandle> AnalysisSession<W> {
    pub fn new(worker: W) -> Self {
        Self {
            worker,
            coordinator: RequestCoordinator::new(),
            timeout: None,
            started: [None; RequestKind::ALL.len()],
            format: None,
            tree: None,
        }
    }

    /// Expire requests that stay pending longer than `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn request_format(
        &mut self,
        source_text: impl Into<String>,
        indent: IndentSpec,
    ) -> Result<RequestId, TransportError> {
        self.dispatch(RequestKind::Format, source_text.into(), Some(indent))
    }

    pub fn request_tree(
        &mut self,
        source_text: impl Into<String>,
    ) -> Result<RequestId, TransportError> {
        self.dispatch(RequestKind::Tree, source_text.into(), None)
    }

    fn dispatch(
        &mut self,
        kind: RequestKind,
        source_text: String,
        indent: Option<IndentSpec>,
    ) -> Result<RequestId, TransportError> {
        self.started[kind.index()] = Some(Instant::now());
        self.coordinator
            .dispatch(&mut self.worker, kind, source_text, indent)
    }

    /// Drain available responses without blocking.
    ///
    /// Returns how many responses were published.
    pub fn pump(&mut self) -> Result<usize, TransportError> {
        let mut published = 0;
        for message in self.worker.drain()? {
            if self.receive(message) {
                published += 1;
            }
        }
        self.expire_overdue(Instant::now());
        Ok(published)
    }

    /// Block until no request is pending or `deadline` passes.
    ///
    /// Returns whether the session went idle.
    pub fn wait_idle(&mut self, deadline: Instant) -> Result<bool, TransportError> {
        loop {
            self.expire_overdue(Instant::now());
            if !self.coordinator.any_pending() {
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            if let Some(message) = self.worker.recv_timeout(deadline - now)? {
                self.receive(message);
            }
        }
    }

    fn receive(&mut self, message: crate::worker::Inbound) -> bool {
        let response = match message {
            Ok(response) => response,
            Err(err) => {
                self.coordinator.reject(&err);
                return false;
            }
        };
        let Some(response) = self.coordinator.accept(response) else {
            return false;
        };
        self.started[response.kind().index()] = None;
        debug!(id = response.id(), kind = %response.kind(), ok = response.is_ok(), "publishing analysis");
        match response {
            AnalysisResponse::Format(format) => {
                self.format = Some(FormatView {
                    request_id: format.id,
                    result: format.result,
                });
            }
            AnalysisResponse::Tree(tree) => {
                self.tree = Some(TreeView {
                    request_id: tree.id,
                    result: tree.result,
                });
            }
        }
        true
    }

    fn expire_overdue(&mut self, now: Instant) {
        let Some(timeout) = self.timeout else {
            return;
        };
        for kind in RequestKind::ALL {
            let overdue = self.started[kind.index()]
                .is_some_and(|started| now.duration_since(started) >= timeout);
            if overdue && self.coordinator.is_pending(kind) {
                warn!(kind = %kind, timeout_ms = timeout.as_millis() as u64, "analysis timed out");
                self.coordinator.expire(kind);
                self.started[kind.index()] = None;
            }
        }
    }

    /// Whether any request is still waiting for its response.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.coordinator.any_pending()
    }

    #[must_use]
    pub fn format_view(&self) -> Option<&FormatView> {
        self.format.as_ref()
    }

    #[must_use]
    pub fn tree_view(&self) -> Option<&TreeView> {
        self.tree.as_ref()
    }

    #[must_use]
    pub fn coordinator(&self) -> &RequestCoordinator {
        &self.coordinator
    }

    pub fn worker_mut(&mut self) -> &mut W {
        &mut self.worker
    }
}
