//! Change-serialization queue for declarative list views.
//!
//! All visual mutations of one list view (content updates, selection changes,
//! structural edits) pass through a [`ChangeQueue`]:
//!
//! * operations start in strict FIFO order;
//! * at most one operation is in progress, and it stays in progress until its
//!   [`Completion`] is signalled, possibly long after its body returned;
//! * the queue can be paused (for example during a reorder gesture) without
//!   dropping or reordering waiting work.
//!
//! Everything here is single-threaded and cooperative. Queue types are
//! `!Send`, and an injected [`MainSequence`] rejects calls made outside the
//! owning dispatch sequence.

mod completion;
mod config;
mod error;
mod operation;
mod pause;
mod queue;
mod sequence;
mod state;

pub use completion::{Completion, CompletionOutcome};
pub use config::{AbandonPolicy, QueueConfig};
pub use error::{CompleteError, ConfigError, InvariantViolation, QueueError, Result};
pub use operation::{OperationId, StateKind};
pub use pause::PauseGuard;
pub use queue::{ChangeQueue, QueueHandle};
pub use sequence::{MainSequence, ThreadAffinity};
pub use state::{QueueSnapshot, QueueStats, StallReason, StallReport};
