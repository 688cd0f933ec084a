//! Tandem trace inspector.
//!
//! Reads a recorded `.trace.in` / `.trace.out` stream and prints either one
//! line per record or aggregate counts. Payloads are shown by size only, so
//! any trace can be inspected without knowing its message type.

mod cli;
mod report;

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use report::{Summary, record_line};
use tandem_config::RuntimeOptions;
use tandem_queue::TraceReader;
use tracing::{debug, info};

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	init_logging(&cli)?;

	match cli.command {
		Command::Inspect { file, limit } => inspect(&file, limit),
		Command::Summary { file } => summary(&file),
	}
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
	let options = match &cli.config {
		Some(path) => RuntimeOptions::load(path).with_context(|| format!("loading options from {}", path.display()))?,
		None => RuntimeOptions::default(),
	};
	if options.log.no_log && !cli.verbose {
		return Ok(());
	}

	let level = if cli.verbose {
		tracing::Level::DEBUG
	} else {
		options.log.console_level.as_tracing_level()
	};
	let subscriber = tracing_subscriber::fmt().with_max_level(level).with_writer(io::stderr).finish();
	tracing::subscriber::set_global_default(subscriber)?;
	Ok(())
}

fn open(file: &Path) -> anyhow::Result<TraceReader> {
	info!(file = %file.display(), "opening trace");
	TraceReader::open(file).with_context(|| format!("opening {}", file.display()))
}

fn inspect(file: &Path, limit: Option<usize>) -> anyhow::Result<()> {
	let reader = open(file)?;
	let mut out = io::stdout().lock();
	for (index, record) in reader.enumerate().take(limit.unwrap_or(usize::MAX)) {
		let record = record.with_context(|| format!("reading record {index} of {}", file.display()))?;
		writeln!(out, "{}", record_line(index, &record))?;
	}
	Ok(())
}

fn summary(file: &Path) -> anyhow::Result<()> {
	let mut summary = Summary::default();
	for (index, record) in open(file)?.enumerate() {
		let record = record.with_context(|| format!("reading record {index} of {}", file.display()))?;
		summary.add(&record);
	}
	debug!(records = summary.records, "trace read");
	println!("{summary}");
	Ok(())
}
