//! Replay script format.
//!
//! ```toml
//! [queue]
//! capacity = 32
//!
//! [list]
//! selection = "multiple"
//! content = "latest_wins"
//!
//! [[step]]
//! op = "content"
//! animated = true
//! sections = [{ id = "inbox", items = [{ id = "a", reorderable = true }, { id = "b" }] }]
//!
//! [[step]]
//! op = "select"
//! item = "a"
//! ```

use std::path::Path;

use anyhow::Context;
use listable_list::{Content, ContentPolicy, IndexPath, ItemId, SelectionMode};
use listable_queue::QueueConfig;
use serde::Deserialize;

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
	Content {
		sections: Content,
		#[serde(default)]
		animated: bool,
	},
	Select {
		item: ItemId,
	},
	Deselect {
		item: ItemId,
	},
	BeginReorder {
		at: IndexPath,
	},
	/// Commits to `to`, or cancels when absent.
	EndReorder {
		#[serde(default)]
		to: Option<IndexPath>,
	},
	/// Signals held completions; all of them when `count` is absent.
	Settle {
		#[serde(default)]
		count: Option<usize>,
	},
	Pause {
		paused: bool,
	},
	CheckStall,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListTable {
	#[serde(default)]
	selection: SelectionMode,
	#[serde(default)]
	content: ContentPolicy,
}

#[derive(Debug, Deserialize)]
struct RawScript {
	#[serde(default)]
	list: ListTable,
	#[serde(default, rename = "step")]
	steps: Vec<Step>,
}

/// A parsed replay script.
#[derive(Debug, Clone)]
pub struct Script {
	pub queue: QueueConfig,
	pub selection: SelectionMode,
	pub content: ContentPolicy,
	pub steps: Vec<Step>,
}

impl Script {
	pub fn parse(src: &str) -> anyhow::Result<Self> {
		let queue = QueueConfig::from_toml_str(src).context("invalid [queue] table")?;
		let raw: RawScript = toml::from_str(src).context("invalid script")?;
		Ok(Self {
			queue,
			selection: raw.list.selection,
			content: raw.list.content,
			steps: raw.steps,
		})
	}

	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let src = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
		Self::parse(&src).with_context(|| format!("failed to load {}", path.display()))
	}
}
