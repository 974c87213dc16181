use listable_queue::QueueError;
use thiserror::Error;

use crate::content::IndexPath;

/// Reasons a reorder gesture cannot proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReorderError {
	/// No item at the requested position.
	#[error("no item at {0}")]
	NoItem(IndexPath),
	/// Item exists but does not allow reordering.
	#[error("item at {0} is not reorderable")]
	NotReorderable(IndexPath),
	/// Another reorder gesture is active.
	#[error("a reorder is already in progress from {from}")]
	AlreadyReordering { from: IndexPath },
	/// No reorder gesture is active.
	#[error("no reorder in progress")]
	NotReordering,
}

/// Errors from list view operations.
#[derive(Debug, Error)]
pub enum ListError {
	#[error(transparent)]
	Queue(#[from] QueueError),
	#[error(transparent)]
	Reorder(#[from] ReorderError),
}

pub type Result<T> = std::result::Result<T, ListError>;
