//! Declarative list client built on [`listable_queue`].
//!
//! A [`ListView`] holds the applied [`Content`] and routes every change
//! through its own [`ChangeQueue`](listable_queue::ChangeQueue):
//!
//! * [`ListView::set_content`] diffs against the applied content when the
//!   operation starts and hands the [`Changeset`] to a [`ViewApplier`], which
//!   signals the completion once the update (and any animation) is done.
//! * [`ListView::select`] and [`ListView::deselect`] are synchronous operations
//!   ordered after any pending content update.
//! * [`ListDelegate`] pauses the queue for the duration of a reorder gesture.

mod applier;
mod content;
mod delegate;
mod diff;
mod error;
mod selection;
mod view;

pub use applier::{UpdateReason, ViewApplier, ViewUpdate};
pub use content::{Content, IndexPath, Item, ItemId, ReapplyRule, Section, SectionId};
pub use delegate::{ListDelegate, ReorderCommit, ReorderOutcome};
pub use diff::{Changeset, ContentDiffer, KeyedDiffer, Move};
pub use error::{ListError, ReorderError, Result};
pub use selection::{SelectionChanged, SelectionMode};
pub use view::{ContentPolicy, ListOptions, ListView};
