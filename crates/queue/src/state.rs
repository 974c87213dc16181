//! Shared queue state and the drain loop.
//!
//! # Mental model
//!
//! * `waiting` holds not-yet-started operations in enqueue order.
//! * `in_progress` holds the one running operation until its completion fires.
//! * `drain` starts operations one at a time, in a loop, until the queue is
//!   paused, busy, or empty. A completion signalled synchronously inside a body
//!   only frees the slot; the loop that invoked the body starts the next one.
//!
//! # Invariants
//!
//! * At most one operation is in progress.
//! * Waiting operations are never reordered, skipped, or duplicated.
//! * No `RefCell` borrow is held while user code (a body) runs.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, error, trace, warn};

use crate::completion::Completion;
use crate::config::{AbandonPolicy, QueueConfig};
use crate::error::{InvariantViolation, QueueError};
use crate::operation::{Body, Operation, OperationId};
use crate::pause::PauseState;
use crate::sequence::MainSequence;

pub(crate) type Shared = Rc<RefCell<Core>>;
pub(crate) type WeakShared = Weak<RefCell<Core>>;

/// Counters describing queue throughput since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
	/// Operations accepted into the waiting sequence.
	pub enqueued: u64,
	/// Operations whose body was invoked.
	pub started: u64,
	/// Operations finished through an explicit completion.
	pub completed: u64,
	/// Operations whose completion was dropped unsignalled.
	pub abandoned: u64,
	/// Enqueue attempts refused for capacity.
	pub rejected: u64,
}

/// Point-in-time view of queue contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSnapshot {
	/// Waiting operations, head first.
	pub waiting: Vec<OperationId>,
	/// Currently running operation.
	pub in_progress: Option<OperationId>,
	/// Effective pause state.
	pub paused: bool,
	/// True when frozen on an abandoned operation.
	pub stalled: bool,
}

/// Why [`ChangeQueue::check_stall`](crate::ChangeQueue::check_stall) reported a stall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallReason {
	/// The running operation exceeded the configured threshold.
	Overdue,
	/// The running operation's completion was dropped under [`AbandonPolicy::Stall`].
	Abandoned,
	/// The running operation was completed or dropped off the owning sequence.
	OffSequence,
}

/// A running operation that is holding up the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StallReport {
	pub id: OperationId,
	pub running_for: Duration,
	pub reason: StallReason,
}

pub(crate) struct Core {
	waiting: VecDeque<Operation>,
	in_progress: Option<Operation>,
	pub(crate) pause: PauseState,
	draining: bool,
	torn_down: bool,
	stalled_on: Option<(OperationId, StallReason)>,
	next_id: u64,
	config: QueueConfig,
	stats: QueueStats,
	sequence: Box<dyn MainSequence>,
}

impl Core {
	pub(crate) fn new(config: QueueConfig, sequence: Box<dyn MainSequence>) -> Self {
		Self {
			waiting: VecDeque::new(),
			in_progress: None,
			pause: PauseState::default(),
			draining: false,
			torn_down: false,
			stalled_on: None,
			next_id: 1,
			config,
			stats: QueueStats::default(),
			sequence,
		}
	}

	/// Rejects access from outside the owning sequence or after teardown.
	pub(crate) fn check_access(&self) -> Result<(), QueueError> {
		if self.torn_down {
			return Err(QueueError::TornDown);
		}
		if !self.sequence.is_current() {
			error!("queue.off_sequence");
			return Err(QueueError::OffSequence);
		}
		Ok(())
	}

	pub(crate) fn is_current_sequence(&self) -> bool {
		self.sequence.is_current()
	}

	pub(crate) const fn is_torn_down(&self) -> bool {
		self.torn_down
	}

	/// Checks access and capacity before an operation is pushed.
	pub(crate) fn check_admission(&mut self) -> Result<(), QueueError> {
		self.check_access()?;
		if let Some(capacity) = self.config.capacity.map(NonZeroUsize::get)
			&& self.waiting.len() >= capacity
		{
			self.stats.rejected += 1;
			warn!(capacity, "queue.enqueue.rejected");
			return Err(QueueError::Full { capacity });
		}
		Ok(())
	}

	/// Appends a new operation to the tail of the waiting sequence.
	pub(crate) fn push(&mut self, body: Body) -> OperationId {
		let id = OperationId::new(self.next_id);
		self.next_id = self.next_id.wrapping_add(1);
		self.waiting.push_back(Operation::new(id, body));
		self.stats.enqueued += 1;
		trace!(op = %id, waiting = self.waiting.len(), "queue.enqueue");
		id
	}

	fn can_start(&self) -> bool {
		!self.torn_down && !self.pause.is_paused() && self.in_progress.is_none()
	}

	/// Pops the head operation, marks it running, and returns its body with a fresh completion.
	fn start_next(&mut self, shared: &Shared) -> Option<(Body, Completion)> {
		if !self.can_start() {
			return None;
		}

		while let Some(mut op) = self.waiting.pop_front() {
			match op.start(Instant::now()) {
				Ok(body) => {
					let id = op.id();
					self.in_progress = Some(op);
					self.stats.started += 1;
					trace!(op = %id, waiting = self.waiting.len(), "queue.start");
					return Some((body, Completion::new(id, Rc::downgrade(shared))));
				}
				Err(violation) => {
					error!(%violation, "queue.start.invalid");
				}
			}
		}
		None
	}

	/// Counts a completed operation and frees the in-progress slot.
	pub(crate) fn finish(&mut self, id: OperationId) -> Result<(), InvariantViolation> {
		self.release(id)?;
		self.stats.completed += 1;
		trace!(op = %id, waiting = self.waiting.len(), "queue.complete");
		Ok(())
	}

	/// Clears the in-progress slot for `id`.
	fn release(&mut self, id: OperationId) -> Result<(), InvariantViolation> {
		let Some(mut op) = self.in_progress.take_if(|op| op.id() == id) else {
			let violation = InvariantViolation::CompletionMismatch {
				completed: id,
				in_progress: self.in_progress.as_ref().map(Operation::id),
			};
			error!(%violation, "queue.complete.invalid");
			return Err(violation);
		};
		op.finish().inspect_err(|violation| error!(%violation, "queue.complete.invalid"))
	}

	/// Handles a completion dropped without being signalled. Returns true if
	/// the queue should advance.
	pub(crate) fn abandon(&mut self, id: OperationId) -> bool {
		if self.torn_down {
			return false;
		}
		self.stats.abandoned += 1;
		if !self.sequence.is_current() {
			self.hold_off_sequence(id);
			return false;
		}
		match self.config.on_abandon {
			AbandonPolicy::Advance => {
				warn!(op = %id, policy = "advance", "queue.abandon");
				self.release(id).is_ok()
			}
			AbandonPolicy::Stall => {
				warn!(op = %id, policy = "stall", "queue.abandon");
				self.stalled_on = Some((id, StallReason::Abandoned));
				false
			}
		}
	}

	/// Freezes the queue on `id`, which was signalled from the wrong sequence.
	/// Nothing may start off-sequence, so the slot stays held.
	pub(crate) fn hold_off_sequence(&mut self, id: OperationId) {
		if self.torn_down {
			return;
		}
		error!(op = %id, "queue.hold.off_sequence");
		self.stalled_on = Some((id, StallReason::OffSequence));
	}

	pub(crate) fn in_progress(&self) -> Option<OperationId> {
		self.in_progress.as_ref().map(Operation::id)
	}

	pub(crate) fn waiting_len(&self) -> usize {
		self.waiting.len()
	}

	pub(crate) fn last_waiting(&self) -> Option<OperationId> {
		self.waiting.back().map(Operation::id)
	}

	pub(crate) const fn stats(&self) -> QueueStats {
		self.stats
	}

	pub(crate) const fn config(&self) -> &QueueConfig {
		&self.config
	}

	pub(crate) fn is_stalled(&self) -> bool {
		self.stalled_on.is_some()
	}

	pub(crate) fn snapshot(&self) -> QueueSnapshot {
		QueueSnapshot {
			waiting: self.waiting.iter().map(Operation::id).collect(),
			in_progress: self.in_progress(),
			paused: self.pause.is_paused(),
			stalled: self.is_stalled(),
		}
	}

	pub(crate) fn check_stall(&mut self, now: Instant) -> Option<StallReport> {
		let stalled_on = self.stalled_on;
		let threshold = self.config.stall_after;
		let op = self.in_progress.as_mut()?;
		let running_for = now.saturating_duration_since(op.started_at()?);

		let reason = if let Some((stalled, reason)) = stalled_on
			&& stalled == op.id()
		{
			reason
		} else if threshold.is_some_and(|threshold| running_for >= threshold) {
			StallReason::Overdue
		} else {
			return None;
		};

		if !op.stall_reported {
			op.stall_reported = true;
			warn!(op = %op.id(), running_ms = running_for.as_millis() as u64, ?reason, "queue.stall");
		}
		Some(StallReport {
			id: op.id(),
			running_for,
			reason,
		})
	}

	/// Marks the queue dead and hands back every waiting operation so the
	/// caller can drop them outside the borrow.
	pub(crate) fn tear_down(&mut self) -> VecDeque<Operation> {
		self.torn_down = true;
		let dropped = std::mem::take(&mut self.waiting);
		debug!(dropped = dropped.len(), in_progress = ?self.in_progress(), "queue.teardown");
		dropped
	}
}

/// Resets the draining flag even if a body unwinds.
struct DrainGuard<'a>(&'a Shared);

impl Drop for DrainGuard<'_> {
	fn drop(&mut self) {
		match self.0.try_borrow_mut() {
			Ok(mut core) => core.draining = false,
			Err(_) => error!("queue.drain.reset.busy"),
		}
	}
}

/// Starts waiting operations until the queue is paused, busy, or empty.
///
/// Re-entrant calls (from a body that enqueues, unpauses, or completes
/// synchronously) return immediately; the outer loop picks up their effects.
pub(crate) fn drain(shared: &Shared) {
	{
		let mut core = shared.borrow_mut();
		if core.draining {
			return;
		}
		core.draining = true;
	}
	let _guard = DrainGuard(shared);

	loop {
		let next = shared.borrow_mut().start_next(shared);
		let Some((body, completion)) = next else {
			break;
		};
		body(completion);
	}
}
