#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use listable_list::{Content, Item, Section, ViewApplier, ViewUpdate};
use listable_queue::Completion;

/// Applier that records every update and optionally holds completions.
#[derive(Clone, Default)]
pub struct Recorder {
	pub updates: Rc<RefCell<Vec<ViewUpdate>>>,
	pending: Rc<RefCell<VecDeque<Completion>>>,
	deferred: bool,
}

impl Recorder {
	pub fn deferred() -> Self {
		Self {
			deferred: true,
			..Self::default()
		}
	}

	pub fn applied(&self) -> usize {
		self.updates.borrow().len()
	}

	pub fn last(&self) -> ViewUpdate {
		self.updates.borrow().last().cloned().expect("no update applied")
	}

	pub fn pending(&self) -> usize {
		self.pending.borrow().len()
	}

	/// Completes held updates, including ones started while settling.
	pub fn settle(&self) {
		loop {
			let next = self.pending.borrow_mut().pop_front();
			let Some(done) = next else {
				break;
			};
			done.complete().unwrap();
		}
	}

	pub fn take_pending(&self) -> Option<Completion> {
		self.pending.borrow_mut().pop_front()
	}
}

impl ViewApplier for Recorder {
	fn apply(&mut self, update: ViewUpdate, done: Completion) {
		self.updates.borrow_mut().push(update);
		if self.deferred {
			self.pending.borrow_mut().push_back(done);
		} else {
			done.complete().unwrap();
		}
	}
}

pub fn single(ids: &[&str]) -> Content {
	Content::new().with_section(Section::new("main").with_items(ids.iter().copied()))
}

pub fn reorderable(ids: &[&str]) -> Content {
	let section = ids
		.iter()
		.fold(Section::new("main"), |section, id| section.with_item(Item::new(*id).reorderable()));
	Content::new().with_section(section)
}
