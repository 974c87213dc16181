//! The list view client: every mutation is an operation on its [`ChangeQueue`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use listable_queue::{ChangeQueue, Completion, OperationId, PauseGuard, QueueConfig};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::applier::{ApplierSlot, UpdateReason, ViewApplier, ViewUpdate};
use crate::content::{Content, IndexPath, ItemId};
use crate::delegate::{ListDelegate, ReorderCommit};
use crate::diff::{ContentDiffer, KeyedDiffer};
use crate::error::Result;
use crate::selection::{Selection, SelectionChanged, SelectionMode};

pub(crate) type SelectionObserver = Rc<dyn Fn(&SelectionChanged)>;
pub(crate) type ReorderObserver = Rc<dyn Fn(&ReorderCommit)>;

/// State shared between the view, its queued operations, and its delegate.
pub(crate) struct Presentation {
	pub(crate) applied: Content,
	pub(crate) selection: Selection,
	pub(crate) reordering: Option<ReorderSession>,
	/// Set once any update has reached the applier.
	pub(crate) has_applied: bool,
	pub(crate) selection_observers: Vec<SelectionObserver>,
	pub(crate) reorder_observers: Vec<ReorderObserver>,
}

impl Presentation {
	fn new(mode: SelectionMode) -> Self {
		Self {
			applied: Content::new(),
			selection: Selection::new(mode),
			reordering: None,
			has_applied: false,
			selection_observers: Vec::new(),
			reorder_observers: Vec::new(),
		}
	}
}

/// An active reorder gesture. The queue stays paused while `_hold` is alive.
#[derive(Debug)]
pub(crate) struct ReorderSession {
	pub(crate) origin: IndexPath,
	pub(crate) _hold: PauseGuard,
}

pub(crate) fn notify_selection(observers: &[SelectionObserver], change: Option<SelectionChanged>) {
	let Some(change) = change else {
		return;
	};
	trace!(added = change.added.len(), removed = change.removed.len(), "list.selection");
	for observer in observers {
		observer(&change);
	}
}

/// What [`ListView::set_content`] does when a content update is already
/// waiting at the tail of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPolicy {
	/// Every call queues its own update.
	#[default]
	Queue,
	/// The new content replaces the waiting update, which keeps its id.
	LatestWins,
}

/// Construction options for a [`ListView`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
	pub queue: QueueConfig,
	pub selection: SelectionMode,
	pub content: ContentPolicy,
}

type PendingContent = Rc<RefCell<Option<(Content, bool)>>>;

/// A list whose content, selection, and reorder changes are serialized
/// through one [`ChangeQueue`].
pub struct ListView<A, D = KeyedDiffer> {
	queue: ChangeQueue,
	presentation: Rc<RefCell<Presentation>>,
	applier: Rc<ApplierSlot<A>>,
	differ: Rc<D>,
	policy: ContentPolicy,
	/// Latest content update enqueued under [`ContentPolicy::LatestWins`].
	tail: RefCell<Option<(OperationId, PendingContent)>>,
}

impl<A: ViewApplier + 'static> ListView<A> {
	pub fn new(applier: A) -> Self {
		Self::with_options(ListOptions::default(), applier, KeyedDiffer)
	}
}

impl<A, D> ListView<A, D>
where
	A: ViewApplier + 'static,
	D: ContentDiffer + 'static,
{
	pub fn with_options(options: ListOptions, applier: A, differ: D) -> Self {
		Self {
			queue: ChangeQueue::with_config(options.queue),
			presentation: Rc::new(RefCell::new(Presentation::new(options.selection))),
			applier: Rc::new(ApplierSlot::new(applier)),
			differ: Rc::new(differ),
			policy: options.content,
			tail: RefCell::new(None),
		}
	}

	/// Queues a content replacement.
	///
	/// The diff is computed when the operation starts, against whatever
	/// content is applied at that moment, so queued updates compose.
	///
	/// Under [`ContentPolicy::LatestWins`] a content update that is still the
	/// last waiting operation is overwritten instead, and its id is returned.
	pub fn set_content(&self, content: Content, animated: bool) -> Result<OperationId> {
		if self.policy == ContentPolicy::LatestWins {
			let tail = self.tail.borrow();
			if let Some((id, pending)) = &*tail
				&& self.queue.last_waiting() == Some(*id)
			{
				debug!(op = %id, "list.content.coalesced");
				*pending.borrow_mut() = Some((content, animated));
				return Ok(*id);
			}
		}

		let presentation = Rc::downgrade(&self.presentation);
		let applier = Rc::downgrade(&self.applier);
		let differ = Rc::clone(&self.differ);
		let pending: PendingContent = Rc::new(RefCell::new(Some((content, animated))));
		let slot = Rc::clone(&pending);
		let id = self.queue.enqueue(move |done| {
			let next = slot.borrow_mut().take();
			match next {
				Some((content, animated)) => apply_content(&presentation, &applier, &*differ, content, animated, done),
				None => done.complete_or_log(),
			}
		})?;
		if self.policy == ContentPolicy::LatestWins {
			*self.tail.borrow_mut() = Some((id, pending));
		}
		Ok(id)
	}

	/// Queues selecting `item`. Unknown items are ignored.
	pub fn select(&self, item: impl Into<ItemId>) -> Result<OperationId> {
		let item = item.into();
		let presentation = Rc::downgrade(&self.presentation);
		let id = self.queue.enqueue_sync(move || {
			let Some(presentation) = presentation.upgrade() else {
				return;
			};
			let (change, observers) = {
				let mut guard = presentation.borrow_mut();
				let state = &mut *guard;
				(state.selection.select(item, &state.applied), state.selection_observers.clone())
			};
			notify_selection(&observers, change);
		})?;
		Ok(id)
	}

	/// Queues deselecting `item`.
	pub fn deselect(&self, item: impl Into<ItemId>) -> Result<OperationId> {
		let item = item.into();
		let presentation = Rc::downgrade(&self.presentation);
		let id = self.queue.enqueue_sync(move || {
			let Some(presentation) = presentation.upgrade() else {
				return;
			};
			let (change, observers) = {
				let mut state = presentation.borrow_mut();
				(state.selection.deselect(&item), state.selection_observers.clone())
			};
			notify_selection(&observers, change);
		})?;
		Ok(id)
	}

	pub fn on_selection_changed(&self, observer: impl Fn(&SelectionChanged) + 'static) {
		self.presentation.borrow_mut().selection_observers.push(Rc::new(observer));
	}

	pub fn on_reorder(&self, observer: impl Fn(&ReorderCommit) + 'static) {
		self.presentation.borrow_mut().reorder_observers.push(Rc::new(observer));
	}

	/// Content most recently handed to the applier.
	pub fn content(&self) -> Content {
		self.presentation.borrow().applied.clone()
	}

	pub fn selected(&self) -> Vec<ItemId> {
		self.presentation.borrow().selection.ids()
	}

	pub fn is_selected(&self, item: &ItemId) -> bool {
		self.presentation.borrow().selection.contains(item)
	}

	pub fn is_reordering(&self) -> bool {
		self.presentation.borrow().reordering.is_some()
	}

	pub fn queue(&self) -> &ChangeQueue {
		&self.queue
	}

	/// Returns the layout delegate driving interactive reorder.
	pub fn delegate(&self) -> ListDelegate {
		ListDelegate::new(Rc::downgrade(&self.presentation), self.queue.handle())
	}

	/// Runs `f` with the applier borrowed.
	///
	/// `f` may signal completions it holds. Updates started by those
	/// completions are delivered after `f` returns.
	///
	/// # Panics
	///
	/// Panics if called from inside [`ViewApplier::apply`].
	pub fn with_applier<R>(&self, f: impl FnOnce(&mut A) -> R) -> R {
		self.applier.with(f)
	}
}

impl<A, D> fmt::Debug for ListView<A, D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let state = self.presentation.borrow();
		f.debug_struct("ListView")
			.field("queue", &self.queue)
			.field("items", &state.applied.item_count())
			.field("reordering", &state.reordering.as_ref().map(|session| session.origin))
			.finish_non_exhaustive()
	}
}

fn apply_content<A, D>(
	presentation: &Weak<RefCell<Presentation>>,
	applier: &Weak<ApplierSlot<A>>,
	differ: &D,
	content: Content,
	animated: bool,
	done: Completion,
) where
	A: ViewApplier,
	D: ContentDiffer + ?Sized,
{
	let (Some(presentation), Some(applier)) = (presentation.upgrade(), applier.upgrade()) else {
		done.complete_or_log();
		return;
	};

	let (update, selection_change, observers) = {
		let mut guard = presentation.borrow_mut();
		let state = &mut *guard;
		let changes = differ.diff(&state.applied, &content);
		let reason = if state.has_applied {
			UpdateReason::ContentChanged
		} else {
			UpdateReason::Initial
		};
		state.applied = content.clone();
		let selection_change = state.selection.retain_in(&state.applied);
		if !changes.is_empty() {
			state.has_applied = true;
		}
		let update = ViewUpdate {
			changes,
			animated,
			reason,
			content,
		};
		(update, selection_change, state.selection_observers.clone())
	};
	notify_selection(&observers, selection_change);

	if update.changes.is_empty() {
		trace!(op = %done.id(), "list.apply.skip");
		done.complete_or_log();
		return;
	}

	debug!(op = %done.id(), changes = update.changes.len(), animated, reason = ?update.reason, "list.apply");
	applier.deliver(update, done);
}
