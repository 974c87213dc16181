//! One-shot completion handle passed to every operation body.
//!
//! The handle is move-only and consumed by [`Completion::complete`], so an
//! operation cannot be completed twice. It refers to the queue weakly: a
//! handle that outlives its queue completes as a no-op.

use std::fmt;

use tracing::error;

use crate::error::CompleteError;
use crate::operation::OperationId;
use crate::state::{WeakShared, drain};

/// Result of signalling a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
	/// The in-progress slot was freed and the queue advanced.
	Advanced,
	/// The queue was already torn down; nothing happened.
	Detached,
}

/// Tells the queue that an operation's effects are fully applied.
///
/// Dropping a handle without calling [`complete`](Self::complete) abandons
/// the operation; see [`AbandonPolicy`](crate::AbandonPolicy).
#[must_use = "the queue does not advance until the completion is signalled"]
pub struct Completion {
	id: OperationId,
	queue: WeakShared,
	armed: bool,
}

impl Completion {
	pub(crate) fn new(id: OperationId, queue: WeakShared) -> Self {
		Self { id, queue, armed: true }
	}

	/// Returns the operation this handle completes.
	pub const fn id(&self) -> OperationId {
		self.id
	}

	/// Marks the operation complete and starts the next waiting one.
	pub fn complete(mut self) -> Result<CompletionOutcome, CompleteError> {
		let Some(shared) = self.queue.upgrade() else {
			self.armed = false;
			return Ok(CompletionOutcome::Detached);
		};

		{
			let core = shared.borrow();
			if core.is_torn_down() {
				drop(core);
				self.armed = false;
				return Ok(CompletionOutcome::Detached);
			}
			if !core.is_current_sequence() {
				drop(core);
				error!(op = %self.id, "queue.complete.off_sequence");
				return Err(CompleteError::OffSequence(self));
			}
		}

		self.armed = false;
		shared.borrow_mut().finish(self.id)?;
		drain(&shared);
		Ok(CompletionOutcome::Advanced)
	}

	/// Completes, logging failures instead of returning them.
	///
	/// A handle rejected as off-sequence is not abandoned: the queue stays on
	/// this operation and [`ChangeQueue::check_stall`](crate::ChangeQueue::check_stall)
	/// reports [`StallReason::OffSequence`](crate::StallReason::OffSequence).
	pub fn complete_or_log(self) {
		let id = self.id;
		match self.complete() {
			Ok(_) => {}
			Err(CompleteError::OffSequence(rejected)) => rejected.hold(),
			Err(err) => error!(op = %id, %err, "queue.complete.failed"),
		}
	}

	fn hold(mut self) {
		self.armed = false;
		let Some(shared) = self.queue.upgrade() else {
			return;
		};
		match shared.try_borrow_mut() {
			Ok(mut core) => core.hold_off_sequence(self.id),
			Err(_) => error!(op = %self.id, "queue.hold.busy"),
		}
	}
}

impl fmt::Debug for Completion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Completion").field("id", &self.id).field("armed", &self.armed).finish()
	}
}

impl Drop for Completion {
	fn drop(&mut self) {
		if !self.armed {
			return;
		}
		let Some(shared) = self.queue.upgrade() else {
			return;
		};
		let advance = match shared.try_borrow_mut() {
			Ok(mut core) => core.abandon(self.id),
			Err(_) => {
				error!(op = %self.id, "queue.abandon.busy");
				false
			}
		};
		if advance {
			drain(&shared);
		}
	}
}
