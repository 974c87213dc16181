//! Queued operation and its explicit lifecycle.
//!
//! An operation moves `New -> Running -> Done` exactly once. The body is
//! moved out of the `New` state when the operation starts, so it cannot run
//! twice, and every other transition is checked and reported as an
//! [`InvariantViolation`] instead of aborting.

use std::fmt;
use std::time::Instant;

use crate::completion::Completion;
use crate::error::InvariantViolation;

/// Body of a queued operation. Receives the completion handle that must be
/// signalled once the operation's effects are fully applied.
pub(crate) type Body = Box<dyn FnOnce(Completion)>;

/// Identifier assigned to an operation at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperationId(u64);

impl OperationId {
	pub(crate) const fn new(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw sequence number.
	pub const fn as_u64(self) -> u64 {
		self.0
	}
}

impl fmt::Display for OperationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "op#{}", self.0)
	}
}

/// Payload-free view of an operation's state, used in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
	New,
	Running,
	Done,
}

impl fmt::Display for StateKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::New => "new",
			Self::Running => "running",
			Self::Done => "done",
		})
	}
}

pub(crate) enum OperationState {
	New(Body),
	Running { started_at: Instant },
	Done,
}

impl OperationState {
	fn kind(&self) -> StateKind {
		match self {
			Self::New(_) => StateKind::New,
			Self::Running { .. } => StateKind::Running,
			Self::Done => StateKind::Done,
		}
	}
}

/// One unit of deferred work owned by the queue.
pub(crate) struct Operation {
	id: OperationId,
	state: OperationState,
	/// Set once a stall warning was emitted for this run.
	pub(crate) stall_reported: bool,
}

impl Operation {
	pub(crate) fn new(id: OperationId, body: Body) -> Self {
		Self {
			id,
			state: OperationState::New(body),
			stall_reported: false,
		}
	}

	pub(crate) const fn id(&self) -> OperationId {
		self.id
	}

	pub(crate) fn state(&self) -> StateKind {
		self.state.kind()
	}

	/// Transitions `New -> Running` and hands back the body to invoke.
	pub(crate) fn start(&mut self, now: Instant) -> Result<Body, InvariantViolation> {
		match std::mem::replace(&mut self.state, OperationState::Running { started_at: now }) {
			OperationState::New(body) => Ok(body),
			other => {
				let found = other.kind();
				self.state = other;
				Err(InvariantViolation::NotNew { id: self.id, found })
			}
		}
	}

	/// Transitions `Running -> Done`.
	pub(crate) fn finish(&mut self) -> Result<(), InvariantViolation> {
		match self.state {
			OperationState::Running { .. } => {
				self.state = OperationState::Done;
				Ok(())
			}
			ref other => Err(InvariantViolation::NotRunning {
				id: self.id,
				found: other.kind(),
			}),
		}
	}

	/// Returns when the operation started, if it is running.
	pub(crate) fn started_at(&self) -> Option<Instant> {
		match self.state {
			OperationState::Running { started_at } => Some(started_at),
			_ => None,
		}
	}
}

impl fmt::Debug for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Operation").field("id", &self.id).field("state", &self.state.kind()).finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noop() -> Operation {
		Operation::new(OperationId::new(7), Box::new(|_completion| {}))
	}

	#[test]
	fn lifecycle_runs_new_running_done() {
		let mut op = noop();
		assert_eq!(op.state(), StateKind::New);
		assert!(op.started_at().is_none());

		let now = Instant::now();
		let _body = op.start(now).expect("new operation should start");
		assert_eq!(op.state(), StateKind::Running);
		assert_eq!(op.started_at(), Some(now));

		op.finish().expect("running operation should finish");
		assert_eq!(op.state(), StateKind::Done);
	}

	#[test]
	fn start_twice_is_reported_without_losing_state() {
		let mut op = noop();
		let _body = op.start(Instant::now()).unwrap();

		let err = op.start(Instant::now()).map(|_| ()).unwrap_err();
		assert_eq!(
			err,
			InvariantViolation::NotNew {
				id: OperationId::new(7),
				found: StateKind::Running,
			}
		);
		assert_eq!(op.state(), StateKind::Running);
	}

	#[test]
	fn finish_requires_running() {
		let mut op = noop();
		assert_eq!(
			op.finish(),
			Err(InvariantViolation::NotRunning {
				id: OperationId::new(7),
				found: StateKind::New,
			})
		);

		let _body = op.start(Instant::now()).unwrap();
		op.finish().unwrap();
		assert_eq!(
			op.finish(),
			Err(InvariantViolation::NotRunning {
				id: OperationId::new(7),
				found: StateKind::Done,
			})
		);
	}

	#[test]
	fn id_displays_with_prefix() {
		assert_eq!(OperationId::new(12).to_string(), "op#12");
	}
}
