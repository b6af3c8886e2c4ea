#![forbid(unsafe_code)]

//! Latest-request-wins bookkeeping.
//!
//! Each [`RequestKind`] has an independent lane with its own id counter. A
//! lane moves `Idle → Pending(id) → Resolved(id)`; dispatching again while
//! pending supersedes the earlier request. Responses are accepted only when
//! their id equals the lane's latest id, so out-of-order or superseded replies
//! are dropped no matter when they arrive.
//!
//! There is no cancellation: the worker finishes stale work and the result is
//! discarded here.

use tracing::{debug, trace, warn};

use jview_core::format::IndentSpec;

use crate::protocol::{AnalysisRequest, AnalysisResponse, ProtocolError, RequestId, RequestKind};
use crate::worker::{TransportError, WorkerHandle};

/// Lifecycle of one request lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestState {
    #[default]
    Idle,
    Pending(RequestId),
    Resolved(RequestId),
}

#[derive(Debug, Clone, Copy, Default)]
struct Lane {
    last_issued: RequestId,
    latest: Option<RequestId>,
    state: RequestState,
}

/// Per-kind id allocation and stale-response filtering.
#[derive(Debug, Clone, Default)]
pub struct RequestCoordinator {
    lanes: [Lane; RequestKind::ALL.len()],
}

impl RequestCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id for `kind` and make it the latest.
    ///
    /// Ids start at 1 and are strictly increasing per kind, even across
    /// [`expire`](Self::expire).
    pub fn begin(&mut self, kind: RequestKind) -> RequestId {
        let lane = &mut self.lanes[kind.index()];
        lane.last_issued += 1;
        let id = lane.last_issued;
        if let RequestState::Pending(previous) = lane.state {
            trace!(kind = %kind, previous, id, "superseding pending request");
        }
        lane.latest = Some(id);
        lane.state = RequestState::Pending(id);
        id
    }

    /// Begin a request and post it to `worker`.
    ///
    /// On a send failure the lane stays pending with the new id; the caller
    /// may dispatch again or [`expire`](Self::expire) it.
    pub fn dispatch<W>(
        &mut self,
        worker: &mut W,
        kind: RequestKind,
        source_text: impl Into<String>,
        indent: Option<IndentSpec>,
    ) -> Result<RequestId, TransportError>
    where
        W: WorkerHandle + ?Sized,
    {
        let id = self.begin(kind);
        let request = AnalysisRequest {
            id,
            kind,
            source_text: source_text.into(),
            indent,
        };
        debug!(id, kind = %kind, bytes = request.source_text.len(), "dispatching analysis");
        worker.post(request).map(|()| id).map_err(|err| {
            warn!(id, kind = %kind, error = %err, "analysis request not delivered");
            err
        })
    }

    /// Pass `response` through if it answers the latest request of its kind.
    pub fn accept(&mut self, response: AnalysisResponse) -> Option<AnalysisResponse> {
        let kind = response.kind();
        let id = response.id();
        let lane = &mut self.lanes[kind.index()];
        if lane.state != RequestState::Pending(id) {
            trace!(
                kind = %kind,
                id,
                latest = ?lane.latest,
                "dropping stale analysis response"
            );
            return None;
        }
        lane.state = RequestState::Resolved(id);
        Some(response)
    }

    /// Record an unreadable message. No lane changes state.
    pub fn reject(&self, error: &ProtocolError) {
        warn!(error = %error, "ignoring unreadable analysis message");
    }

    /// Give up on the pending request of `kind`. A late reply is dropped.
    pub fn expire(&mut self, kind: RequestKind) {
        let lane = &mut self.lanes[kind.index()];
        if let RequestState::Pending(id) = lane.state {
            debug!(kind = %kind, id, "analysis request expired");
        }
        lane.latest = None;
        lane.state = RequestState::Idle;
    }

    #[must_use]
    pub fn state(&self, kind: RequestKind) -> RequestState {
        self.lanes[kind.index()].state
    }

    /// The id a response must carry to be accepted, if any.
    #[must_use]
    pub fn latest(&self, kind: RequestKind) -> Option<RequestId> {
        self.lanes[kind.index()].latest
    }

    #[must_use]
    pub fn is_pending(&self, kind: RequestKind) -> bool {
        matches!(self.state(kind), RequestState::Pending(_))
    }

    /// Whether any lane is waiting on a response.
    #[must_use]
    pub fn any_pending(&self) -> bool {
        RequestKind::ALL.iter().any(|&kind| self.is_pending(kind))
    }
}
