//! Listable replay binary.
//!
//! Loads a TOML script of list changes, drives a queued list view with a
//! recording applier, and prints one line per applied update followed by a
//! queue summary.

mod cli;
mod runner;
mod script;

use clap::Parser;
use cli::Cli;
use script::Script;
use tracing::info;

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	setup_tracing(cli.verbose);

	let script = Script::load(&cli.script)?;
	info!(path = %cli.script.display(), steps = script.steps.len(), deferred = cli.deferred, "replay.start");

	for line in runner::run(&script, cli.deferred) {
		println!("{line}");
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	// LISTABLE_LOG takes precedence over RUST_LOG.
	let filter = EnvFilter::try_from_env("LISTABLE_LOG")
		.or_else(|_| EnvFilter::try_from_default_env())
		.unwrap_or_else(|_| {
			if verbose {
				EnvFilter::new("listable_queue=trace,listable_list=debug,listable_replay=debug,info")
			} else {
				EnvFilter::new("warn")
			}
		});

	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(true)
		.init();
}
