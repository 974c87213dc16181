//! Admission gate for starting the next operation.
//!
//! Pausing never touches the running operation or the waiting sequence; it
//! only keeps `drain` from starting the next operation. The queue is paused
//! while the manual flag is set or any [`PauseGuard`] is alive.

use std::fmt;

use tracing::{debug, error};

use crate::state::{WeakShared, drain};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PauseState {
	pub(crate) manual: bool,
	pub(crate) holds: usize,
}

impl PauseState {
	pub(crate) const fn is_paused(&self) -> bool {
		self.manual || self.holds > 0
	}
}

/// Counted pause hold. The queue stays paused until every guard is dropped
/// and the manual flag is clear.
#[must_use = "the queue resumes as soon as the guard is dropped"]
pub struct PauseGuard {
	queue: WeakShared,
}

impl PauseGuard {
	pub(crate) fn new(queue: WeakShared) -> Self {
		Self { queue }
	}
}

impl fmt::Debug for PauseGuard {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PauseGuard").field("attached", &(self.queue.strong_count() > 0)).finish()
	}
}

impl Drop for PauseGuard {
	fn drop(&mut self) {
		let Some(shared) = self.queue.upgrade() else {
			return;
		};
		let resumed = match shared.try_borrow_mut() {
			Ok(mut core) => {
				let was_paused = core.pause.is_paused();
				core.pause.holds = core.pause.holds.saturating_sub(1);
				debug!(holds = core.pause.holds, manual = core.pause.manual, "queue.pause.release");
				was_paused && !core.pause.is_paused() && !core.is_torn_down()
			}
			Err(_) => {
				error!("queue.pause.release.busy");
				false
			}
		};
		if resumed {
			drain(&shared);
		}
	}
}
