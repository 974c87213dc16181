//! Seam between the list client and whatever draws the rows.

use std::cell::RefCell;
use std::collections::VecDeque;

use listable_queue::Completion;
use tracing::trace;

use crate::content::Content;
use crate::diff::Changeset;

/// Why an update was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateReason {
	/// First content applied to an empty view.
	Initial,
	/// Replacement of previously applied content.
	ContentChanged,
}

/// One batch of changes handed to a [`ViewApplier`].
#[derive(Debug, Clone)]
pub struct ViewUpdate {
	pub changes: Changeset,
	pub animated: bool,
	pub reason: UpdateReason,
	/// Content the view shows once the update is applied.
	pub content: Content,
}

/// Applies changesets to the visible view.
///
/// The applier decides when `done` is signalled: immediately for a plain
/// reload, or once an animation finishes. No further update is delivered
/// until it is.
pub trait ViewApplier {
	fn apply(&mut self, update: ViewUpdate, done: Completion);
}

impl<F> ViewApplier for F
where
	F: FnMut(ViewUpdate, Completion),
{
	fn apply(&mut self, update: ViewUpdate, done: Completion) {
		self(update, done)
	}
}

/// Owns the applier and delivers updates only while it is not borrowed.
///
/// A completion signalled while the applier is in use (from inside `apply`
/// or from [`ListView::with_applier`](crate::ListView::with_applier)) can
/// start the next update; that update waits here and is delivered once the
/// outer borrow ends.
pub(crate) struct ApplierSlot<A> {
	applier: RefCell<A>,
	pending: RefCell<VecDeque<(ViewUpdate, Completion)>>,
}

impl<A: ViewApplier> ApplierSlot<A> {
	pub(crate) fn new(applier: A) -> Self {
		Self {
			applier: RefCell::new(applier),
			pending: RefCell::new(VecDeque::new()),
		}
	}

	pub(crate) fn deliver(&self, update: ViewUpdate, done: Completion) {
		self.pending.borrow_mut().push_back((update, done));
		self.flush();
	}

	pub(crate) fn with<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
		let result = f(&mut *self.applier.borrow_mut());
		self.flush();
		result
	}

	fn flush(&self) {
		loop {
			let Ok(mut applier) = self.applier.try_borrow_mut() else {
				trace!("list.apply.deferred");
				return;
			};
			let next = self.pending.borrow_mut().pop_front();
			let Some((update, done)) = next else {
				return;
			};
			applier.apply(update, done);
		}
	}
}
