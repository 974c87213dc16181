//! Drives a [`ListView`] through a [`Script`] and records what happened.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::rc::Rc;

use listable_list::{Content, ListOptions, ListView, ReorderOutcome, UpdateReason, ViewApplier, ViewUpdate};
use listable_queue::{Completion, StallReason};
use tracing::debug;

use crate::script::{Script, Step};

type Transcript = Rc<RefCell<Vec<String>>>;

/// Applier that writes one transcript line per update.
///
/// In deferred mode completions are held until [`Journal::settle`].
#[derive(Clone, Default)]
struct Journal {
	lines: Transcript,
	held: Rc<RefCell<VecDeque<Completion>>>,
	deferred: bool,
}

impl Journal {
	fn settle(&self, count: Option<usize>) -> usize {
		let mut settled = 0;
		while count.is_none_or(|count| settled < count) {
			let next = self.held.borrow_mut().pop_front();
			let Some(done) = next else {
				break;
			};
			done.complete_or_log();
			settled += 1;
		}
		settled
	}

	fn held(&self) -> usize {
		self.held.borrow().len()
	}
}

impl ViewApplier for Journal {
	fn apply(&mut self, update: ViewUpdate, done: Completion) {
		self.lines.borrow_mut().push(format!("{} apply {}", done.id(), describe(&update)));
		if self.deferred {
			self.held.borrow_mut().push_back(done);
		} else {
			done.complete_or_log();
		}
	}
}

fn describe(update: &ViewUpdate) -> String {
	let changes = &update.changes;
	let reason = match update.reason {
		UpdateReason::Initial => "initial",
		UpdateReason::ContentChanged => "changed",
	};
	let mut line = format!(
		"{reason}{} sections(+{} -{} ~{}) items(+{} -{} ~{} !{}) =>",
		if update.animated { " animated" } else { "" },
		changes.section_inserts.len(),
		changes.section_removes.len(),
		changes.section_moves.len(),
		changes.item_inserts.len(),
		changes.item_removes.len(),
		changes.item_moves.len(),
		changes.item_updates.len(),
	);
	write_content(&mut line, &update.content);
	line
}

fn write_content(out: &mut String, content: &Content) {
	for section in &content.sections {
		let ids: Vec<&str> = section.items.iter().map(|item| item.id.as_str()).collect();
		let _ = write!(out, " {}[{}]", section.id, ids.join(" "));
	}
}

/// Runs `script` and returns the transcript, one line per event plus a summary.
pub fn run(script: &Script, deferred: bool) -> Vec<String> {
	let journal = Journal {
		deferred,
		..Journal::default()
	};
	let options = ListOptions {
		queue: script.queue.clone(),
		selection: script.selection,
		content: script.content,
	};
	let view = ListView::with_options(options, journal.clone(), listable_list::KeyedDiffer);

	let lines = Rc::clone(&journal.lines);
	view.on_selection_changed(move |change| {
		let ids: Vec<&str> = change.selected.iter().map(|id| id.as_str()).collect();
		lines.borrow_mut().push(format!("selection [{}]", ids.join(" ")));
	});
	let lines = Rc::clone(&journal.lines);
	view.on_reorder(move |commit| {
		lines
			.borrow_mut()
			.push(format!("reorder {} {} -> {}", commit.item, commit.from, commit.to));
	});

	let delegate = view.delegate();
	for (index, step) in script.steps.iter().enumerate() {
		debug!(step = index, ?step, "replay.step");
		let result = match step {
			Step::Content { sections, animated } => view.set_content(sections.clone(), *animated).map(drop),
			Step::Select { item } => view.select(item.clone()).map(drop),
			Step::Deselect { item } => view.deselect(item.clone()).map(drop),
			Step::BeginReorder { at } => delegate.begin_reorder(*at),
			Step::EndReorder { to } => {
				let outcome = to.map_or(ReorderOutcome::Cancel, |to| ReorderOutcome::Commit { to });
				delegate.end_reorder(outcome).map(drop)
			}
			Step::Settle { count } => {
				let settled = journal.settle(*count);
				debug!(settled, "replay.settle");
				Ok(())
			}
			Step::Pause { paused } => view.queue().set_paused(*paused).map_err(Into::into),
			Step::CheckStall => {
				let line = match view.queue().check_stall() {
					Some(report) => {
						let reason = match report.reason {
							StallReason::Overdue => "overdue",
							StallReason::Abandoned => "abandoned",
							StallReason::OffSequence => "off_sequence",
						};
						format!("stall {} {reason}", report.id)
					}
					None => "stall none".to_string(),
				};
				journal.lines.borrow_mut().push(line);
				Ok(())
			}
		};
		if let Err(err) = result {
			journal.lines.borrow_mut().push(format!("step {index} error: {err}"));
		}
	}

	let stats = view.queue().stats();
	let snapshot = view.queue().snapshot();
	let summary = format!(
		"summary enqueued={} completed={} rejected={} waiting={} in_progress={} paused={} held={}",
		stats.enqueued,
		stats.completed,
		stats.rejected,
		snapshot.waiting.len(),
		snapshot.in_progress.map_or_else(|| "-".to_string(), |id| id.to_string()),
		snapshot.paused,
		journal.held(),
	);
	journal.lines.borrow_mut().push(summary);
	drop(delegate);
	drop(view);

	journal.lines.take()
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn replay(src: &str, deferred: bool) -> Vec<String> {
		run(&Script::parse(src).unwrap(), deferred)
	}

	const TWO_UPDATES: &str = r#"
		[[step]]
		op = "content"
		sections = [{ id = "s", items = [{ id = "a" }, { id = "b" }] }]

		[[step]]
		op = "content"
		animated = true
		sections = [{ id = "s", items = [{ id = "b" }, { id = "c" }] }]
	"#;

	#[test]
	fn synchronous_replay_applies_in_order() {
		let lines = replay(TWO_UPDATES, false);
		assert_eq!(
			lines,
			vec![
				"op#1 apply initial sections(+1 -0 ~0) items(+0 -0 ~0 !0) => s[a b]",
				"op#2 apply changed animated sections(+0 -0 ~0) items(+1 -1 ~0 !0) => s[b c]",
				"summary enqueued=2 completed=2 rejected=0 waiting=0 in_progress=- paused=false held=0",
			]
		);
	}

	#[test]
	fn deferred_replay_waits_for_settle() {
		let lines = replay(TWO_UPDATES, true);
		assert_eq!(lines.len(), 2);
		assert!(lines[0].starts_with("op#1 apply initial"));
		assert_eq!(lines[1], "summary enqueued=2 completed=0 rejected=0 waiting=1 in_progress=op#1 paused=false held=1");
	}

	#[test]
	fn settle_releases_the_next_update() {
		let src = format!("{TWO_UPDATES}\n[[step]]\nop = \"settle\"\n");
		let lines = replay(&src, true);
		assert!(lines[1].starts_with("op#2 apply changed"));
		assert!(lines[2].ends_with("in_progress=- paused=false held=0"));
	}

	#[test]
	fn reorder_and_selection_are_recorded() {
		let lines = replay(
			r#"
			[list]
			selection = "single"

			[[step]]
			op = "content"
			sections = [{ id = "s", items = [{ id = "a", reorderable = true }, { id = "b" }] }]

			[[step]]
			op = "select"
			item = "b"

			[[step]]
			op = "begin_reorder"
			at = { section = 0, item = 0 }

			[[step]]
			op = "end_reorder"
			to = { section = 0, item = 1 }

			[[step]]
			op = "begin_reorder"
			at = { section = 0, item = 0 }
			"#,
			false,
		);
		assert_eq!(lines[1], "selection [b]");
		assert_eq!(lines[2], "reorder a [0, 0] -> [0, 1]");
		assert_eq!(lines[3], "step 4 error: item at [0, 0] is not reorderable");
	}

	#[test]
	fn stall_check_reports_overdue_update() {
		let lines = replay(
			r#"
			[queue]
			stall_after_ms = 0

			[[step]]
			op = "content"
			sections = [{ id = "s", items = [{ id = "a" }] }]

			[[step]]
			op = "check_stall"
			"#,
			true,
		);
		assert_eq!(lines[1], "stall op#1 overdue");
	}

	#[test]
	fn full_queue_is_reported_per_step() {
		let lines = replay(
			r#"
			[queue]
			capacity = 1

			[[step]]
			op = "pause"
			paused = true

			[[step]]
			op = "select"
			item = "a"

			[[step]]
			op = "select"
			item = "b"
			"#,
			false,
		);
		assert_eq!(lines[0], "step 2 error: change queue is full (capacity 1)");
		assert!(lines[1].contains("rejected=1 waiting=1"));
	}

	#[test]
	fn latest_wins_script_coalesces_waiting_content() {
		let src = format!("[list]\ncontent = \"latest_wins\"\n{TWO_UPDATES}{TWO_UPDATES}\n[[step]]\nop = \"settle\"\n");
		let lines = replay(&src, true);
		assert_eq!(lines.len(), 3);
		assert!(lines[0].starts_with("op#1 apply initial"));
		assert!(lines[1].starts_with("op#2 apply changed animated"));
		assert!(lines[1].ends_with("=> s[b c]"));
		assert_eq!(lines[2], "summary enqueued=2 completed=2 rejected=0 waiting=0 in_progress=- paused=false held=0");
	}
}
