//! Immutable value model describing list content.

use std::fmt;

use serde::Deserialize;

/// Stable identity of an item across content snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

/// Stable identity of a section across content snapshots.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(transparent)]
pub struct SectionId(String);

macro_rules! string_id {
	($name:ident) => {
		impl $name {
			pub fn as_str(&self) -> &str {
				&self.0
			}
		}

		impl From<&str> for $name {
			fn from(value: &str) -> Self {
				Self(value.to_string())
			}
		}

		impl From<String> for $name {
			fn from(value: String) -> Self {
				Self(value)
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				f.write_str(&self.0)
			}
		}
	};
}

string_id!(ItemId);
string_id!(SectionId);

/// Position of an item: section index, then item index within the section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
pub struct IndexPath {
	pub section: usize,
	pub item: usize,
}

impl IndexPath {
	pub const fn new(section: usize, item: usize) -> Self {
		Self { section, item }
	}
}

impl fmt::Display for IndexPath {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "[{}, {}]", self.section, self.item)
	}
}

/// When a surviving item is re-applied to its visible view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReapplyRule {
	/// Every update re-applies the item.
	Always,
	/// Only a revision change re-applies the item.
	#[default]
	WhenChanged,
}

/// One row of the list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Item {
	pub id: ItemId,
	/// Bumped by the caller whenever the item's visible content changes.
	#[serde(default)]
	pub revision: u64,
	#[serde(default)]
	pub reorderable: bool,
	#[serde(default)]
	pub reapply: ReapplyRule,
}

impl Item {
	pub fn new(id: impl Into<ItemId>) -> Self {
		Self {
			id: id.into(),
			revision: 0,
			reorderable: false,
			reapply: ReapplyRule::default(),
		}
	}

	pub fn revision(mut self, revision: u64) -> Self {
		self.revision = revision;
		self
	}

	pub fn reorderable(mut self) -> Self {
		self.reorderable = true;
		self
	}

	pub fn reapply(mut self, rule: ReapplyRule) -> Self {
		self.reapply = rule;
		self
	}
}

/// Ordered group of items.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Section {
	pub id: SectionId,
	#[serde(default)]
	pub items: Vec<Item>,
}

impl Section {
	pub fn new(id: impl Into<SectionId>) -> Self {
		Self {
			id: id.into(),
			items: Vec::new(),
		}
	}

	pub fn with_item(mut self, item: Item) -> Self {
		self.items.push(item);
		self
	}

	/// Adds plain items with the given ids.
	pub fn with_items<I, S>(mut self, ids: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<ItemId>,
	{
		self.items.extend(ids.into_iter().map(Item::new));
		self
	}
}

/// Snapshot of everything a list view displays.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Content {
	pub sections: Vec<Section>,
}

impl Content {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_section(mut self, section: Section) -> Self {
		self.sections.push(section);
		self
	}

	pub fn item_count(&self) -> usize {
		self.sections.iter().map(|section| section.items.len()).sum()
	}

	pub fn item_at(&self, path: IndexPath) -> Option<&Item> {
		self.sections.get(path.section)?.items.get(path.item)
	}

	/// Returns the first position holding `id`.
	pub fn index_of(&self, id: &ItemId) -> Option<IndexPath> {
		self.paths().find(|(_, item)| &item.id == id).map(|(path, _)| path)
	}

	pub fn contains(&self, id: &ItemId) -> bool {
		self.index_of(id).is_some()
	}

	/// Iterates items with their positions in display order.
	pub fn paths(&self) -> impl Iterator<Item = (IndexPath, &Item)> {
		self.sections.iter().enumerate().flat_map(|(section, s)| {
			s.items
				.iter()
				.enumerate()
				.map(move |(item, value)| (IndexPath::new(section, item), value))
		})
	}

	/// Returns true if an item could be inserted at `path` after removing one from `from`.
	pub fn accepts_move(&self, from: IndexPath, to: IndexPath) -> bool {
		let Some(section) = self.sections.get(to.section) else {
			return false;
		};
		let len = section.items.len();
		if from.section == to.section { to.item < len } else { to.item <= len }
	}

	/// Moves the item at `from` so it ends up at `to`. Returns false and leaves
	/// the content untouched if either position is invalid.
	pub fn move_item(&mut self, from: IndexPath, to: IndexPath) -> bool {
		if self.item_at(from).is_none() || !self.accepts_move(from, to) {
			return false;
		}
		let item = self.sections[from.section].items.remove(from.item);
		self.sections[to.section].items.insert(to.item, item);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Content {
		Content::new()
			.with_section(Section::new("fruit").with_items(["apple", "pear", "plum"]))
			.with_section(Section::new("veg").with_items(["kale"]))
	}

	#[test]
	fn lookup_by_path_and_id() {
		let content = sample();
		assert_eq!(content.item_count(), 4);
		assert_eq!(content.item_at(IndexPath::new(0, 1)).map(|item| item.id.as_str()), Some("pear"));
		assert_eq!(content.index_of(&"kale".into()), Some(IndexPath::new(1, 0)));
		assert!(!content.contains(&"corn".into()));
		assert!(content.item_at(IndexPath::new(2, 0)).is_none());
	}

	#[test]
	fn move_within_and_across_sections() {
		let mut content = sample();
		assert!(content.move_item(IndexPath::new(0, 0), IndexPath::new(0, 2)));
		let ids: Vec<_> = content.sections[0].items.iter().map(|item| item.id.as_str()).collect();
		assert_eq!(ids, ["pear", "plum", "apple"]);

		assert!(content.move_item(IndexPath::new(0, 0), IndexPath::new(1, 1)));
		assert_eq!(content.index_of(&"pear".into()), Some(IndexPath::new(1, 1)));
	}

	#[test]
	fn invalid_move_is_rejected_without_change() {
		let mut content = sample();
		let before = content.clone();
		assert!(!content.move_item(IndexPath::new(0, 0), IndexPath::new(0, 3)));
		assert!(!content.move_item(IndexPath::new(0, 9), IndexPath::new(0, 0)));
		assert!(!content.move_item(IndexPath::new(0, 0), IndexPath::new(5, 0)));
		assert_eq!(content, before);
	}

	#[test]
	fn deserializes_from_toml() {
		#[derive(Deserialize)]
		struct Doc {
			content: Content,
		}

		let doc: Doc = toml::from_str(
			r#"
			[[content]]
			id = "inbox"
			items = [
				{ id = "a", revision = 2, reorderable = true },
				{ id = "b", reapply = "always" },
			]
			"#,
		)
		.unwrap();

		let items = &doc.content.sections[0].items;
		assert_eq!(items[0], Item::new("a").revision(2).reorderable());
		assert_eq!(items[1], Item::new("b").reapply(ReapplyRule::Always));
	}
}
