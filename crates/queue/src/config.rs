//! Queue admission and stall policies, loadable from TOML.
//!
//! ```toml
//! [queue]
//! capacity = 64
//! stall_after_ms = 2000
//! on_abandon = "advance"
//! ```

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// What to do when a [`Completion`](crate::Completion) is dropped without being signalled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbandonPolicy {
	/// Log, count, and advance as if the operation completed.
	#[default]
	Advance,
	/// Log and leave the queue frozen on the abandoned operation.
	Stall,
}

/// Queue behaviour knobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueConfig {
	/// Maximum number of waiting operations. `None` is unbounded.
	pub capacity: Option<NonZeroUsize>,
	/// Running time after which [`ChangeQueue::check_stall`](crate::ChangeQueue::check_stall) reports a stall.
	pub stall_after: Option<Duration>,
	/// Handling of dropped, unsignalled completions.
	pub on_abandon: AbandonPolicy,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawQueueConfig {
	capacity: Option<usize>,
	stall_after_ms: Option<u64>,
	#[serde(default)]
	on_abandon: AbandonPolicy,
}

#[derive(Debug, Default, Deserialize)]
struct RawDocument {
	#[serde(default)]
	queue: Option<RawQueueConfig>,
}

impl TryFrom<RawQueueConfig> for QueueConfig {
	type Error = ConfigError;

	fn try_from(raw: RawQueueConfig) -> Result<Self, Self::Error> {
		let capacity = raw
			.capacity
			.map(|capacity| NonZeroUsize::new(capacity).ok_or_else(|| ConfigError::Invalid("capacity must be > 0".to_string())))
			.transpose()?;
		Ok(Self {
			capacity,
			stall_after: raw.stall_after_ms.map(Duration::from_millis),
			on_abandon: raw.on_abandon,
		})
	}
}

impl QueueConfig {
	/// Sets the stall threshold.
	pub fn with_stall_after(mut self, threshold: Duration) -> Self {
		self.stall_after = Some(threshold);
		self
	}

	/// Sets the waiting capacity.
	pub fn with_capacity(mut self, capacity: NonZeroUsize) -> Self {
		self.capacity = Some(capacity);
		self
	}

	/// Sets the abandonment policy.
	pub fn with_abandon_policy(mut self, policy: AbandonPolicy) -> Self {
		self.on_abandon = policy;
		self
	}

	/// Parses the `[queue]` table of a TOML document. A missing table yields defaults.
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let doc: RawDocument = toml::from_str(src)?;
		doc.queue.map(Self::try_from).transpose().map(Option::unwrap_or_default)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let src = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&src)
	}
}
