use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tandem-trace")]
#[command(about = "Inspect tandem receive traces")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Runtime options file, used for its logging section
	#[arg(long, value_name = "FILE", global = true)]
	pub config: Option<PathBuf>,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Print one line per recorded pop
	Inspect {
		/// Trace stream (`.trace.in` or `.trace.out`)
		file: PathBuf,

		/// Stop after this many records
		#[arg(long, short = 'n')]
		limit: Option<usize>,
	},
	/// Print record counts and total recorded wait
	Summary {
		/// Trace stream (`.trace.in` or `.trace.out`)
		file: PathBuf,
	},
}
