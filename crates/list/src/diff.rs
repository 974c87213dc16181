//! Keyed diffing between two [`Content`] snapshots.
//!
//! Sections and items are matched by id. Items inside a removed or inserted
//! section are covered by the section operation and never appear as item
//! operations. Removes use old index paths; inserts, moves' destinations, and
//! updates use new index paths.

use std::collections::HashMap;

use crate::content::{Content, IndexPath, ItemId, ReapplyRule, SectionId};

/// Source and destination of a moved element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move<T> {
	pub from: T,
	pub to: T,
}

/// Structural difference between two content snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
	pub section_removes: Vec<usize>,
	pub section_inserts: Vec<usize>,
	pub section_moves: Vec<Move<usize>>,
	pub item_removes: Vec<IndexPath>,
	pub item_inserts: Vec<IndexPath>,
	pub item_moves: Vec<Move<IndexPath>>,
	/// Surviving items to re-apply in place.
	pub item_updates: Vec<IndexPath>,
}

impl Changeset {
	/// Total number of section and item operations.
	pub fn len(&self) -> usize {
		self.section_removes.len()
			+ self.section_inserts.len()
			+ self.section_moves.len()
			+ self.item_removes.len()
			+ self.item_inserts.len()
			+ self.item_moves.len()
			+ self.item_updates.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

/// Computes the changes that turn one content snapshot into another.
pub trait ContentDiffer {
	fn diff(&self, old: &Content, new: &Content) -> Changeset;
}

/// Identity-based differ producing a minimal move set.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyedDiffer;

impl ContentDiffer for KeyedDiffer {
	fn diff(&self, old: &Content, new: &Content) -> Changeset {
		let mut changes = Changeset::default();

		// Section index in `old` for every section index in `new`.
		let old_sections = first_index(old.sections.iter().map(|section| &section.id));
		let mut section_map: Vec<Option<usize>> = Vec::with_capacity(new.sections.len());
		let mut matched_old = vec![false; old.sections.len()];
		for section in &new.sections {
			let found = old_sections.get(&section.id).copied().filter(|&index| !matched_old[index]);
			if let Some(index) = found {
				matched_old[index] = true;
			}
			section_map.push(found);
		}

		changes.section_removes = (0..old.sections.len()).filter(|&index| !matched_old[index]).collect();
		changes.section_inserts = section_map
			.iter()
			.enumerate()
			.filter_map(|(index, found)| found.is_none().then_some(index))
			.collect();

		let surviving: Vec<(usize, usize)> = section_map
			.iter()
			.enumerate()
			.filter_map(|(to, found)| found.map(|from| (from, to)))
			.collect();
		let kept = stable_positions(&surviving.iter().map(|&(from, _)| from).collect::<Vec<_>>());
		changes.section_moves = surviving
			.iter()
			.zip(&kept)
			.filter(|(_, stays)| !**stays)
			.map(|(&(from, to), _)| Move { from, to })
			.collect();

		// Items of surviving old sections, keyed by id.
		let mut old_items: HashMap<&ItemId, IndexPath> = HashMap::new();
		for &(from_section, _) in &surviving {
			for (index, item) in old.sections[from_section].items.iter().enumerate() {
				old_items.entry(&item.id).or_insert(IndexPath::new(from_section, index));
			}
		}

		let mut claimed: HashMap<IndexPath, IndexPath> = HashMap::new();
		for &(from_section, to_section) in &surviving {
			let mut in_place: Vec<(IndexPath, IndexPath)> = Vec::new();
			for (index, item) in new.sections[to_section].items.iter().enumerate() {
				let to = IndexPath::new(to_section, index);
				let Some(&from) = old_items.get(&item.id).filter(|from| !claimed.contains_key(*from)) else {
					changes.item_inserts.push(to);
					continue;
				};
				claimed.insert(from, to);

				let previous = &old.sections[from.section].items[from.item];
				if item.reapply == ReapplyRule::Always || previous.revision != item.revision {
					changes.item_updates.push(to);
				}
				if from.section == from_section {
					in_place.push((from, to));
				} else {
					changes.item_moves.push(Move { from, to });
				}
			}

			let kept = stable_positions(&in_place.iter().map(|(from, _)| from.item).collect::<Vec<_>>());
			changes
				.item_moves
				.extend(in_place.iter().zip(&kept).filter(|(_, stays)| !**stays).map(|(&(from, to), _)| Move { from, to }));
		}

		for &(from_section, _) in &surviving {
			for index in 0..old.sections[from_section].items.len() {
				let from = IndexPath::new(from_section, index);
				if !claimed.contains_key(&from) {
					changes.item_removes.push(from);
				}
			}
		}

		changes.item_removes.sort_unstable();
		changes.item_inserts.sort_unstable();
		changes.item_updates.sort_unstable();
		changes.item_moves.sort_unstable_by_key(|mv| mv.to);
		changes
	}
}

fn first_index<'a>(ids: impl Iterator<Item = &'a SectionId>) -> HashMap<&'a SectionId, usize> {
	let mut map = HashMap::new();
	for (index, id) in ids.enumerate() {
		map.entry(id).or_insert(index);
	}
	map
}

/// Marks the elements of one longest strictly increasing subsequence.
///
/// Elements outside it are the minimal set that must move for the sequence
/// to become sorted.
fn stable_positions(seq: &[usize]) -> Vec<bool> {
	let mut tails: Vec<usize> = Vec::new();
	let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
	for (i, &value) in seq.iter().enumerate() {
		let slot = tails.partition_point(|&t| seq[t] < value);
		if slot > 0 {
			prev[i] = Some(tails[slot - 1]);
		}
		if slot == tails.len() {
			tails.push(i);
		} else {
			tails[slot] = i;
		}
	}

	let mut keep = vec![false; seq.len()];
	let mut cursor = tails.last().copied();
	while let Some(i) = cursor {
		keep[i] = true;
		cursor = prev[i];
	}
	keep
}
