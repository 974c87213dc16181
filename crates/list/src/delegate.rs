//! Layout delegate for interactive reordering.
//!
//! While a reorder gesture is active the visible layout no longer matches the
//! applied content, so the delegate holds a pause on the view's queue: content
//! updates enqueued during the gesture wait until it ends and then apply
//! against the committed order. The hold is counted, so a pause the host set
//! on its own outlives the gesture.

use std::cell::RefCell;
use std::rc::Weak;

use listable_queue::QueueHandle;
use tracing::debug;

use crate::content::{IndexPath, ItemId};
use crate::error::{ReorderError, Result};
use crate::view::{Presentation, ReorderSession};

/// How a reorder gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReorderOutcome {
	/// Drop the item at `to`.
	Commit { to: IndexPath },
	/// Return the item to where it started.
	Cancel,
}

/// A committed move, reported to reorder observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderCommit {
	pub item: ItemId,
	pub from: IndexPath,
	pub to: IndexPath,
}

/// Non-owning delegate returned by [`ListView::delegate`](crate::ListView::delegate).
///
/// Every call is a no-op once the view is dropped.
#[derive(Clone)]
pub struct ListDelegate {
	presentation: Weak<RefCell<Presentation>>,
	queue: QueueHandle,
}

impl ListDelegate {
	pub(crate) fn new(presentation: Weak<RefCell<Presentation>>, queue: QueueHandle) -> Self {
		Self { presentation, queue }
	}

	/// Starts a reorder gesture for the item at `from` and holds the queue
	/// paused until it ends.
	pub fn begin_reorder(&self, from: IndexPath) -> Result<()> {
		let Some(presentation) = self.presentation.upgrade() else {
			return Ok(());
		};

		{
			let state = presentation.borrow();
			if let Some(active) = &state.reordering {
				return Err(ReorderError::AlreadyReordering { from: active.origin }.into());
			}
			let item = state.applied.item_at(from).ok_or(ReorderError::NoItem(from))?;
			if !item.reorderable {
				return Err(ReorderError::NotReorderable(from).into());
			}
		}

		let hold = self.queue.pause()?;
		presentation.borrow_mut().reordering = Some(ReorderSession { origin: from, _hold: hold });
		debug!(%from, "list.reorder.begin");
		Ok(())
	}

	/// Resolves where the item currently at `from` may be dropped when the
	/// gesture proposes `to`.
	pub fn validate_destination(&self, from: IndexPath, to: IndexPath) -> IndexPath {
		if from == to {
			return to;
		}
		let Some(presentation) = self.presentation.upgrade() else {
			return from;
		};
		let state = presentation.borrow();

		let Some(origin) = state.reordering.as_ref().map(|session| session.origin) else {
			return from;
		};
		if to == origin {
			return to;
		}
		match state.applied.item_at(origin) {
			Some(item) if item.reorderable && state.applied.accepts_move(origin, to) => to,
			_ => from,
		}
	}

	/// Ends the active gesture and releases its pause hold.
	///
	/// Returns the applied move, or `None` when the gesture was cancelled or
	/// dropped the item where it started.
	pub fn end_reorder(&self, outcome: ReorderOutcome) -> Result<Option<ReorderCommit>> {
		let Some(presentation) = self.presentation.upgrade() else {
			return Ok(None);
		};

		let origin = self.reorder_origin().ok_or(ReorderError::NotReordering)?;
		let destination = match outcome {
			ReorderOutcome::Commit { to } => self.validate_destination(origin, to),
			ReorderOutcome::Cancel => origin,
		};

		let (session, commit, observers) = {
			let mut state = presentation.borrow_mut();
			let session = state.reordering.take();
			let item = state.applied.item_at(origin).map(|item| item.id.clone());
			let moved = destination != origin && state.applied.move_item(origin, destination);
			let commit = item.filter(|_| moved).map(|item| ReorderCommit {
				item,
				from: origin,
				to: destination,
			});
			(session, commit, state.reorder_observers.clone())
		};

		match &commit {
			Some(commit) => {
				debug!(item = %commit.item, from = %commit.from, to = %commit.to, "list.reorder");
				for observer in &observers {
					observer(commit);
				}
			}
			None => debug!(%origin, "list.reorder.cancel"),
		}

		// Releasing the hold may start queued updates.
		drop(session);
		Ok(commit)
	}

	/// Returns the origin of the active gesture.
	pub fn reorder_origin(&self) -> Option<IndexPath> {
		let presentation = self.presentation.upgrade()?;
		let state = presentation.borrow();
		state.reordering.as_ref().map(|session| session.origin)
	}
}

impl std::fmt::Debug for ListDelegate {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ListDelegate")
			.field("attached", &(self.presentation.strong_count() > 0))
			.field("queue", &self.queue)
			.finish()
	}
}
