mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{Recorder, single};
use listable_list::{
	Content, ContentPolicy, IndexPath, ItemId, ListOptions, ListView, Section, SelectionChanged, SelectionMode, UpdateReason,
	ViewApplier, ViewUpdate,
};
use listable_queue::{Completion, CompletionOutcome, QueueConfig};
use pretty_assertions::assert_eq;

fn multi_select(recorder: Recorder) -> ListView<Recorder> {
	let options = ListOptions {
		queue: QueueConfig::default(),
		selection: SelectionMode::Multiple,
		..ListOptions::default()
	};
	ListView::with_options(options, recorder, listable_list::KeyedDiffer)
}

fn latest_wins(recorder: Recorder) -> ListView<Recorder> {
	let options = ListOptions {
		content: ContentPolicy::LatestWins,
		..ListOptions::default()
	};
	ListView::with_options(options, recorder, listable_list::KeyedDiffer)
}

/// Keeps completions until the host finishes its animations.
#[derive(Default)]
struct Animator {
	running: Vec<Completion>,
	started: Vec<ViewUpdate>,
}

impl Animator {
	fn finish(&mut self) -> usize {
		let running = std::mem::take(&mut self.running);
		let finished = running.len();
		for done in running {
			done.complete().unwrap();
		}
		finished
	}
}

impl ViewApplier for Animator {
	fn apply(&mut self, update: ViewUpdate, done: Completion) {
		self.started.push(update);
		self.running.push(done);
	}
}

fn observe(view: &ListView<Recorder>) -> Rc<RefCell<Vec<SelectionChanged>>> {
	let seen = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&seen);
	view.on_selection_changed(move |change| sink.borrow_mut().push(change.clone()));
	seen
}

#[test]
fn first_content_is_an_initial_update() {
	let recorder = Recorder::default();
	let view = ListView::new(recorder.clone());
	let content = Content::new()
		.with_section(Section::new("a").with_items(["1"]))
		.with_section(Section::new("b").with_items(["2"]));

	view.set_content(content.clone(), false).unwrap();

	let update = recorder.last();
	assert_eq!(update.reason, UpdateReason::Initial);
	assert_eq!(update.changes.section_inserts, vec![0, 1]);
	assert!(!update.animated);
	assert_eq!(view.content(), content);
	assert!(view.queue().is_idle());
}

#[test]
fn queued_updates_diff_against_the_content_applied_before_them() {
	let recorder = Recorder::deferred();
	let view = ListView::new(recorder.clone());

	view.set_content(single(&["a", "b"]), true).unwrap();
	view.set_content(single(&["b", "c"]), true).unwrap();
	assert_eq!(recorder.applied(), 1);
	assert_eq!(view.queue().waiting_len(), 1);

	recorder.settle();

	assert_eq!(recorder.applied(), 2);
	let second = recorder.last();
	assert_eq!(second.reason, UpdateReason::ContentChanged);
	assert_eq!(second.changes.item_removes, vec![IndexPath::new(0, 0)]);
	assert_eq!(second.changes.item_inserts, vec![IndexPath::new(0, 1)]);
	assert!(view.queue().is_idle());
}

#[test]
fn unchanged_content_skips_the_applier() {
	let recorder = Recorder::deferred();
	let view = ListView::new(recorder.clone());
	view.set_content(single(&["a"]), false).unwrap();
	recorder.settle();

	view.set_content(single(&["a"]), false).unwrap();

	assert_eq!(recorder.applied(), 1);
	assert_eq!(recorder.pending(), 0);
	assert!(view.queue().is_idle());
}

#[test]
fn selection_waits_for_pending_content() {
	let recorder = Recorder::deferred();
	let view = multi_select(recorder.clone());

	view.set_content(single(&["a", "b"]), true).unwrap();
	view.select("a").unwrap();
	assert!(view.selected().is_empty());

	recorder.settle();
	assert_eq!(view.selected(), vec![ItemId::from("a")]);
	assert!(view.is_selected(&"a".into()));
}

#[test]
fn observer_fires_only_on_real_changes() {
	let view = multi_select(Recorder::default());
	let seen = observe(&view);
	view.set_content(single(&["a", "b"]), false).unwrap();

	view.select("a").unwrap();
	view.select("a").unwrap();
	view.select("missing").unwrap();
	view.deselect("b").unwrap();
	view.deselect("a").unwrap();

	let seen = seen.borrow();
	assert_eq!(seen.len(), 2);
	assert_eq!(seen[0].added, vec![ItemId::from("a")]);
	assert_eq!(seen[1].removed, vec![ItemId::from("a")]);
	assert!(seen[1].selected.is_empty());
}

#[test]
fn removed_items_are_deselected() {
	let view = multi_select(Recorder::default());
	let seen = observe(&view);
	view.set_content(single(&["a", "b"]), false).unwrap();
	view.select("a").unwrap();
	view.select("b").unwrap();

	view.set_content(single(&["b"]), false).unwrap();

	assert_eq!(view.selected(), vec![ItemId::from("b")]);
	assert_eq!(seen.borrow().last().map(|change| change.removed.clone()), Some(vec![ItemId::from("a")]));
}

#[test]
fn single_mode_keeps_one_selection() {
	let view = ListView::new(Recorder::default());
	view.set_content(single(&["a", "b"]), false).unwrap();
	view.select("a").unwrap();
	view.select("b").unwrap();
	assert_eq!(view.selected(), vec![ItemId::from("b")]);
}

#[test]
fn dropping_the_view_detaches_pending_completions() {
	let recorder = Recorder::deferred();
	let view = ListView::new(recorder.clone());
	view.set_content(single(&["a"]), true).unwrap();
	view.set_content(single(&["b"]), true).unwrap();
	let handle = view.queue().handle();

	drop(view);

	assert!(!handle.is_attached());
	let done = recorder.take_pending().unwrap();
	assert_eq!(done.complete().unwrap(), CompletionOutcome::Detached);
	assert_eq!(recorder.applied(), 1);
}

#[test]
fn applier_closure_is_accepted() {
	let count = Rc::new(RefCell::new(0));
	let sink = Rc::clone(&count);
	let view = ListView::new(move |_update: listable_list::ViewUpdate, done: listable_queue::Completion| {
		*sink.borrow_mut() += 1;
		done.complete_or_log();
	});

	view.set_content(single(&["a"]), false).unwrap();
	view.set_content(single(&["a", "b"]), false).unwrap();

	assert_eq!(*count.borrow(), 2);
	assert_eq!(view.queue().stats().completed, 2);
}

#[test]
fn finishing_inside_with_applier_delivers_the_next_update_afterwards() {
	let view = ListView::new(Animator::default());
	view.set_content(single(&["a"]), true).unwrap();
	view.set_content(single(&["a", "b"]), true).unwrap();
	assert_eq!(view.with_applier(|animator| animator.started.len()), 1);

	let finished = view.with_applier(Animator::finish);

	assert_eq!(finished, 1);
	let (started, running) = view.with_applier(|animator| (animator.started.len(), animator.running.len()));
	assert_eq!((started, running), (2, 1));
	assert_eq!(view.content(), single(&["a", "b"]));

	view.with_applier(Animator::finish);
	assert!(view.queue().is_idle());
	assert_eq!(view.queue().stats().completed, 2);
}

#[test]
fn refilling_an_emptied_view_is_not_initial() {
	let recorder = Recorder::default();
	let view = ListView::new(recorder.clone());

	view.set_content(single(&["a"]), false).unwrap();
	view.set_content(Content::new(), false).unwrap();
	view.set_content(single(&["a"]), false).unwrap();

	let reasons: Vec<UpdateReason> = recorder.updates.borrow().iter().map(|update| update.reason).collect();
	assert_eq!(
		reasons,
		vec![UpdateReason::Initial, UpdateReason::ContentChanged, UpdateReason::ContentChanged]
	);
}

#[test]
fn latest_wins_replaces_the_waiting_update() {
	let recorder = Recorder::deferred();
	let view = latest_wins(recorder.clone());

	let first = view.set_content(single(&["a"]), false).unwrap();
	let second = view.set_content(single(&["a", "b"]), false).unwrap();
	let third = view.set_content(single(&["a", "c"]), true).unwrap();
	assert_ne!(first, second);
	assert_eq!(second, third);
	assert_eq!(view.queue().waiting_len(), 1);

	recorder.settle();

	assert_eq!(recorder.applied(), 2);
	let last = recorder.last();
	assert!(last.animated);
	assert_eq!(last.changes.item_inserts, vec![IndexPath::new(0, 1)]);
	assert_eq!(view.content(), single(&["a", "c"]));
	assert_eq!(view.queue().stats().enqueued, 2);
}

#[test]
fn latest_wins_does_not_jump_over_later_operations() {
	let recorder = Recorder::deferred();
	let view = latest_wins(recorder.clone());

	view.set_content(single(&["a", "b"]), false).unwrap();
	let pending = view.set_content(single(&["a", "b", "c"]), false).unwrap();
	view.select("c").unwrap();
	let after_select = view.set_content(single(&["c"]), false).unwrap();
	assert_ne!(pending, after_select);
	assert_eq!(view.queue().waiting_len(), 3);

	recorder.settle();

	assert_eq!(recorder.applied(), 3);
	assert_eq!(view.selected(), vec![ItemId::from("c")]);
	assert_eq!(view.content(), single(&["c"]));
}

#[test]
fn queue_policy_keeps_every_update() {
	let recorder = Recorder::deferred();
	let view = ListView::new(recorder.clone());

	view.set_content(single(&["a"]), false).unwrap();
	view.set_content(single(&["a", "b"]), false).unwrap();
	view.set_content(single(&["a", "c"]), false).unwrap();
	recorder.settle();

	assert_eq!(recorder.applied(), 3);
}
