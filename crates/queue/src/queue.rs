//! Public queue API.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Instant;

use tracing::debug;

use crate::completion::Completion;
use crate::config::QueueConfig;
use crate::error::{QueueError, Result};
use crate::operation::{Body, OperationId};
use crate::pause::PauseGuard;
use crate::sequence::{MainSequence, ThreadAffinity};
use crate::state::{Core, QueueSnapshot, QueueStats, Shared, StallReport, WeakShared, drain};

/// Strictly ordered, single-flight queue of list changes.
///
/// Every content update, selection change, and structural edit for one list
/// view flows through one `ChangeQueue`. Operations start in enqueue order,
/// one at a time, and the next one starts only after the previous
/// operation's [`Completion`] is signalled.
///
/// The queue is `!Send`: it lives on the sequence that owns the view.
/// Dropping it drops all waiting operations without running them.
pub struct ChangeQueue {
	core: Shared,
}

impl Default for ChangeQueue {
	fn default() -> Self {
		Self::new()
	}
}

impl ChangeQueue {
	/// Creates an unbounded queue bound to the current thread.
	pub fn new() -> Self {
		Self::with_config(QueueConfig::default())
	}

	/// Creates a queue bound to the current thread.
	pub fn with_config(config: QueueConfig) -> Self {
		Self::with_sequence(config, ThreadAffinity::current())
	}

	/// Creates a queue that accepts calls only when `sequence` reports current.
	pub fn with_sequence(config: QueueConfig, sequence: impl MainSequence + 'static) -> Self {
		Self {
			core: Rc::new(RefCell::new(Core::new(config, Box::new(sequence)))),
		}
	}

	/// Appends an operation whose effects are finished once its completion is signalled.
	///
	/// The body must eventually call [`Completion::complete`]; until then no
	/// later operation starts.
	pub fn enqueue<F>(&self, body: F) -> Result<OperationId>
	where
		F: FnOnce(Completion) + 'static,
	{
		enqueue_body(&self.core, Box::new(body))
	}

	/// Appends a plain action that counts as complete when it returns.
	pub fn enqueue_sync<F>(&self, block: F) -> Result<OperationId>
	where
		F: FnOnce() + 'static,
	{
		enqueue_body(&self.core, sync_body(block))
	}

	/// Appends an operation backed by a future.
	///
	/// `make` runs when the operation starts and its future is spawned on the
	/// current [`tokio::task::LocalSet`]; the operation completes when the
	/// future resolves. Must be drained from inside a `LocalSet`.
	pub fn enqueue_async<M, Fut>(&self, make: M) -> Result<OperationId>
	where
		M: FnOnce() -> Fut + 'static,
		Fut: Future<Output = ()> + 'static,
	{
		enqueue_body(&self.core, async_body(make))
	}

	/// Sets the manual pause flag. Setting the current value is a no-op.
	pub fn set_paused(&self, paused: bool) -> Result<()> {
		set_paused(&self.core, paused)
	}

	/// Takes a counted pause hold released when the guard drops.
	pub fn pause(&self) -> Result<PauseGuard> {
		pause(&self.core)
	}

	/// Returns the effective pause state.
	pub fn is_paused(&self) -> bool {
		self.core.borrow().pause.is_paused()
	}

	/// Returns the running operation, if any.
	pub fn in_progress(&self) -> Option<OperationId> {
		self.core.borrow().in_progress()
	}

	/// Returns the number of operations waiting to start.
	pub fn waiting_len(&self) -> usize {
		self.core.borrow().waiting_len()
	}

	/// Returns the most recently enqueued operation that has not started yet.
	pub fn last_waiting(&self) -> Option<OperationId> {
		self.core.borrow().last_waiting()
	}

	/// Returns true when nothing is running or waiting.
	pub fn is_idle(&self) -> bool {
		let core = self.core.borrow();
		core.in_progress().is_none() && core.waiting_len() == 0
	}

	/// Returns true when frozen on an abandoned operation.
	pub fn is_stalled(&self) -> bool {
		self.core.borrow().is_stalled()
	}

	pub fn snapshot(&self) -> QueueSnapshot {
		self.core.borrow().snapshot()
	}

	pub fn stats(&self) -> QueueStats {
		self.core.borrow().stats()
	}

	pub fn config(&self) -> QueueConfig {
		self.core.borrow().config().clone()
	}

	/// Reports the running operation if it is stalled.
	///
	/// Detection only: a stalled operation is never force-completed. A warning
	/// is logged the first time each operation is reported.
	pub fn check_stall(&self) -> Option<StallReport> {
		self.core.borrow_mut().check_stall(Instant::now())
	}

	/// Returns a non-owning handle for collaborators such as layout delegates.
	pub fn handle(&self) -> QueueHandle {
		QueueHandle {
			core: Rc::downgrade(&self.core),
		}
	}
}

impl Drop for ChangeQueue {
	fn drop(&mut self) {
		let dropped = match self.core.try_borrow_mut() {
			Ok(mut core) => core.tear_down(),
			Err(_) => return,
		};
		drop(dropped);
	}
}

impl fmt::Debug for ChangeQueue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ChangeQueue").field("snapshot", &self.snapshot()).finish()
	}
}

/// Weak reference to a [`ChangeQueue`].
///
/// Every call fails with [`QueueError::TornDown`] once the queue is dropped.
#[derive(Clone)]
pub struct QueueHandle {
	core: WeakShared,
}

impl QueueHandle {
	fn upgrade(&self) -> Result<Shared> {
		self.core.upgrade().ok_or(QueueError::TornDown)
	}

	/// See [`ChangeQueue::enqueue`].
	pub fn enqueue<F>(&self, body: F) -> Result<OperationId>
	where
		F: FnOnce(Completion) + 'static,
	{
		enqueue_body(&self.upgrade()?, Box::new(body))
	}

	/// See [`ChangeQueue::enqueue_sync`].
	pub fn enqueue_sync<F>(&self, block: F) -> Result<OperationId>
	where
		F: FnOnce() + 'static,
	{
		enqueue_body(&self.upgrade()?, sync_body(block))
	}

	/// See [`ChangeQueue::enqueue_async`].
	pub fn enqueue_async<M, Fut>(&self, make: M) -> Result<OperationId>
	where
		M: FnOnce() -> Fut + 'static,
		Fut: Future<Output = ()> + 'static,
	{
		enqueue_body(&self.upgrade()?, async_body(make))
	}

	/// See [`ChangeQueue::set_paused`].
	pub fn set_paused(&self, paused: bool) -> Result<()> {
		set_paused(&self.upgrade()?, paused)
	}

	/// See [`ChangeQueue::pause`].
	pub fn pause(&self) -> Result<PauseGuard> {
		pause(&self.upgrade()?)
	}

	/// Returns the effective pause state, or `None` after teardown.
	pub fn is_paused(&self) -> Option<bool> {
		let shared = self.core.upgrade()?;
		let core = shared.borrow();
		(!core.is_torn_down()).then(|| core.pause.is_paused())
	}

	/// Returns true while the owning queue is alive.
	pub fn is_attached(&self) -> bool {
		self.core.upgrade().is_some_and(|shared| {
			let torn_down = shared.borrow().is_torn_down();
			!torn_down
		})
	}
}

impl fmt::Debug for QueueHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("QueueHandle").field("attached", &self.is_attached()).finish()
	}
}

fn sync_body<F>(block: F) -> Body
where
	F: FnOnce() + 'static,
{
	Box::new(move |completion: Completion| {
		block();
		completion.complete_or_log();
	})
}

fn async_body<M, Fut>(make: M) -> Body
where
	M: FnOnce() -> Fut + 'static,
	Fut: Future<Output = ()> + 'static,
{
	Box::new(move |completion: Completion| {
		let fut = make();
		tokio::task::spawn_local(async move {
			fut.await;
			completion.complete_or_log();
		});
	})
}

fn enqueue_body(shared: &Shared, body: Body) -> Result<OperationId> {
	// A rejected body is dropped only after the borrow ends.
	let id = {
		let mut core = shared.borrow_mut();
		core.check_admission()?;
		core.push(body)
	};
	drain(shared);
	Ok(id)
}

fn set_paused(shared: &Shared, paused: bool) -> Result<()> {
	let resumed = {
		let mut core = shared.borrow_mut();
		core.check_access()?;
		if core.pause.manual == paused {
			return Ok(());
		}
		let was_paused = core.pause.is_paused();
		core.pause.manual = paused;
		debug!(paused, holds = core.pause.holds, "queue.pause");
		was_paused && !core.pause.is_paused()
	};
	if resumed {
		drain(shared);
	}
	Ok(())
}

fn pause(shared: &Shared) -> Result<PauseGuard> {
	let mut core = shared.borrow_mut();
	core.check_access()?;
	core.pause.holds += 1;
	debug!(holds = core.pause.holds, manual = core.pause.manual, "queue.pause.hold");
	Ok(PauseGuard::new(Rc::downgrade(shared)))
}
