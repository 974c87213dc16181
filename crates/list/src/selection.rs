//! Selection bookkeeping.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::content::{Content, ItemId};

/// How many items may be selected at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
	None,
	#[default]
	Single,
	Multiple,
}

/// Reported to selection observers; only emitted for real changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionChanged {
	pub selected: Vec<ItemId>,
	pub added: Vec<ItemId>,
	pub removed: Vec<ItemId>,
}

#[derive(Debug, Default)]
pub(crate) struct Selection {
	mode: SelectionMode,
	selected: BTreeSet<ItemId>,
}

impl Selection {
	pub(crate) fn new(mode: SelectionMode) -> Self {
		Self {
			mode,
			selected: BTreeSet::new(),
		}
	}

	pub(crate) fn ids(&self) -> Vec<ItemId> {
		self.selected.iter().cloned().collect()
	}

	pub(crate) fn contains(&self, id: &ItemId) -> bool {
		self.selected.contains(id)
	}

	pub(crate) fn select(&mut self, id: ItemId, content: &Content) -> Option<SelectionChanged> {
		if self.mode == SelectionMode::None || !content.contains(&id) || self.selected.contains(&id) {
			return None;
		}
		let removed = match self.mode {
			SelectionMode::Single => std::mem::take(&mut self.selected).into_iter().collect(),
			_ => Vec::new(),
		};
		self.selected.insert(id.clone());
		Some(self.changed(vec![id], removed))
	}

	pub(crate) fn deselect(&mut self, id: &ItemId) -> Option<SelectionChanged> {
		self.selected.remove(id).then(|| self.changed(Vec::new(), vec![id.clone()]))
	}

	/// Drops selected items missing from `content`.
	pub(crate) fn retain_in(&mut self, content: &Content) -> Option<SelectionChanged> {
		let removed: Vec<ItemId> = self.selected.iter().filter(|id| !content.contains(id)).cloned().collect();
		if removed.is_empty() {
			return None;
		}
		for id in &removed {
			self.selected.remove(id);
		}
		Some(self.changed(Vec::new(), removed))
	}

	fn changed(&self, added: Vec<ItemId>, removed: Vec<ItemId>) -> SelectionChanged {
		SelectionChanged {
			selected: self.ids(),
			added,
			removed,
		}
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::content::Section;

	fn content(ids: &[&str]) -> Content {
		Content::new().with_section(Section::new("main").with_items(ids.iter().copied()))
	}

	#[test]
	fn single_mode_replaces_selection() {
		let content = content(&["a", "b"]);
		let mut selection = Selection::new(SelectionMode::Single);
		selection.select("a".into(), &content).unwrap();
		let change = selection.select("b".into(), &content).unwrap();
		assert_eq!(change.selected, vec![ItemId::from("b")]);
		assert_eq!(change.removed, vec![ItemId::from("a")]);
	}

	#[test]
	fn repeated_and_unknown_selects_are_silent() {
		let content = content(&["a"]);
		let mut selection = Selection::new(SelectionMode::Multiple);
		assert!(selection.select("a".into(), &content).is_some());
		assert!(selection.select("a".into(), &content).is_none());
		assert!(selection.select("zzz".into(), &content).is_none());
		assert!(selection.deselect(&"zzz".into()).is_none());
	}

	#[test]
	fn none_mode_never_selects() {
		let mut selection = Selection::new(SelectionMode::None);
		assert!(selection.select("a".into(), &content(&["a"])).is_none());
	}

	#[test]
	fn removed_items_leave_selection() {
		let mut selection = Selection::new(SelectionMode::Multiple);
		let before = content(&["a", "b"]);
		selection.select("a".into(), &before);
		selection.select("b".into(), &before);
		let change = selection.retain_in(&content(&["b"])).unwrap();
		assert_eq!(change.removed, vec![ItemId::from("a")]);
		assert_eq!(change.selected, vec![ItemId::from("b")]);
		assert!(selection.retain_in(&content(&["b"])).is_none());
	}
}
