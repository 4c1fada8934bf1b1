//! Explicit single-flight refresh state shared by every request path.
//!
//! The coordinator replaces the ambient module-level `isRefreshing` flag + queue found
//! in typical interceptor implementations with an owned, injectable collaborator. The
//! check-and-set in [`acquire_or_enqueue`](RefreshCoordinator::acquire_or_enqueue) and
//! the flag-clear + queue-take in [`release`](RefreshCoordinator::release) each run
//! inside one critical section, so at most one leader exists at a time and no waiter
//! can slip in between a release and the drain of the queue it returned.

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	http::{ApiRequest, ApiResponse},
};

/// One-shot continuation settled exactly once with a queued request's replay outcome.
pub type PendingSettlement = oneshot::Sender<Result<ApiResponse>>;
/// Receiving half awaited by a queued caller.
pub type PendingOutcome = oneshot::Receiver<Result<ApiResponse>>;

/// A request that failed authorization while a refresh was in flight, parked until the
/// refresh resolves.
pub struct PendingRequest {
	/// The original descriptor, retried verbatim once the token is known.
	pub request: ApiRequest,
	/// Continuation settled with the replay outcome.
	pub settle: PendingSettlement,
}

/// Decision returned by [`RefreshCoordinator::acquire_or_enqueue`].
pub enum AcquireOutcome {
	/// No refresh was in flight. The in-flight flag is already set; the caller must
	/// drive the refresh and eventually call [`RefreshCoordinator::release`].
	Lead(ApiRequest),
	/// A refresh is in flight; await the receiver for the replay outcome.
	Enqueued(PendingOutcome),
}

#[derive(Default)]
struct RefreshState {
	refreshing: bool,
	queue: Vec<PendingRequest>,
}

/// Tracks whether a refresh is in flight and parks concurrent authorization failures.
///
/// Enqueued work cannot be withdrawn; a caller that loses interest drops its receiver
/// and the eventual settlement is discarded.
#[derive(Default)]
pub struct RefreshCoordinator(Mutex<RefreshState>);
impl RefreshCoordinator {
	/// Either claims refresh leadership for the caller or parks the descriptor.
	pub fn acquire_or_enqueue(&self, request: ApiRequest) -> AcquireOutcome {
		let mut state = self.0.lock();

		if state.refreshing {
			let (settle, outcome) = oneshot::channel();

			state.queue.push(PendingRequest { request, settle });

			AcquireOutcome::Enqueued(outcome)
		} else {
			state.refreshing = true;

			AcquireOutcome::Lead(request)
		}
	}

	/// Clears the in-flight flag and takes the queue in enqueue order.
	///
	/// The caller owns every returned waiter and must settle each exactly once.
	pub fn release(&self) -> Vec<PendingRequest> {
		let mut state = self.0.lock();

		state.refreshing = false;

		mem::take(&mut state.queue)
	}

	/// Returns `true` while a refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.0.lock().refreshing
	}
}
impl Debug for RefreshCoordinator {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let state = self.0.lock();

		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &state.refreshing)
			.field("queued", &state.queue.len())
			.finish()
	}
}
