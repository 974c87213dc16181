use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "listable-replay")]
#[command(about = "Replay a scripted sequence of list changes through a change queue")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// TOML script with optional `[queue]` and `[list]` tables and `[[step]]` entries
	#[arg(value_name = "SCRIPT")]
	pub script: PathBuf,

	/// Hold every view update until a `settle` step completes it
	#[arg(long)]
	pub deferred: bool,

	/// Verbose logging
	#[arg(short, long)]
	pub verbose: bool,
}
