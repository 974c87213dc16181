//! Owning-sequence checks for queue access.
//!
//! Queue types are `!Send`, so they can never leave the thread that built
//! them. A [`MainSequence`] narrows that further: hosts with their own
//! dispatch loop can reject calls made outside it, and tests can simulate a
//! violation without spawning threads.

use std::thread::{self, ThreadId};

/// Answers whether the caller is running on the queue's owning sequence.
pub trait MainSequence {
	/// Returns true when queue access is allowed from the current context.
	fn is_current(&self) -> bool;
}

/// Sequence bound to the thread that created it.
#[derive(Debug, Clone, Copy)]
pub struct ThreadAffinity {
	owner: ThreadId,
}

impl ThreadAffinity {
	/// Binds to the calling thread.
	pub fn current() -> Self {
		Self { owner: thread::current().id() }
	}

	/// Returns the owning thread.
	pub const fn owner(&self) -> ThreadId {
		self.owner
	}
}

impl Default for ThreadAffinity {
	fn default() -> Self {
		Self::current()
	}
}

impl MainSequence for ThreadAffinity {
	fn is_current(&self) -> bool {
		thread::current().id() == self.owner
	}
}

impl<F> MainSequence for F
where
	F: Fn() -> bool,
{
	fn is_current(&self) -> bool {
		self()
	}
}
