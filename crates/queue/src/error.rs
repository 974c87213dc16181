//! Error types for queue admission, completion, and configuration.

use std::path::PathBuf;

use thiserror::Error;

use crate::completion::Completion;
use crate::operation::{OperationId, StateKind};

/// Errors returned by queue entry points.
#[derive(Debug, Error)]
pub enum QueueError {
	/// The waiting sequence is at its configured capacity.
	#[error("change queue is full (capacity {capacity})")]
	Full {
		/// Configured waiting capacity.
		capacity: usize,
	},

	/// The call was made outside the queue's owning sequence.
	#[error("change queue accessed off its owning sequence")]
	OffSequence,

	/// The owning queue has been dropped.
	#[error("change queue was torn down")]
	TornDown,

	/// Queue bookkeeping reached a state that should be unreachable.
	#[error(transparent)]
	Invariant(#[from] InvariantViolation),
}

/// Illegal operation lifecycle transitions.
///
/// These indicate a bug in the queue or in code that reaches into its
/// internals; callers are not expected to recover from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvariantViolation {
	/// Tried to start an operation that already left the `New` state.
	#[error("{id} cannot start from state {found}")]
	NotNew {
		/// Offending operation.
		id: OperationId,
		/// State found instead of `New`.
		found: StateKind,
	},

	/// Tried to finish an operation that is not `Running`.
	#[error("{id} cannot finish from state {found}")]
	NotRunning {
		/// Offending operation.
		id: OperationId,
		/// State found instead of `Running`.
		found: StateKind,
	},

	/// A completion arrived for an operation other than the one in progress.
	#[error("completion for {completed} does not match in-progress {in_progress:?}")]
	CompletionMismatch {
		/// Operation named by the completion handle.
		completed: OperationId,
		/// Operation held in the in-progress slot, if any.
		in_progress: Option<OperationId>,
	},
}

/// Failure to signal a [`Completion`].
#[derive(Debug, Error)]
pub enum CompleteError {
	/// Signalled off the owning sequence. The untouched handle is returned so
	/// it can be completed again from the right place.
	#[error("completion signalled off the owning sequence")]
	OffSequence(Completion),

	/// The queue did not hold the matching running operation.
	#[error(transparent)]
	Invariant(#[from] InvariantViolation),
}

/// Errors that can occur when loading queue configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// TOML syntax or shape error.
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// A value parsed but is not usable.
	#[error("invalid queue config: {0}")]
	Invalid(String),
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
