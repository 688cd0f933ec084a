//! Rendering of trace records for the terminal.

use std::fmt;
use std::time::Duration;

use tandem_queue::{RecordedOutcome, TraceRecord};

/// One `inspect` line: index, recorded wait and outcome.
pub fn record_line(index: usize, record: &TraceRecord) -> String {
	let delay = match record.delay {
		Some(delay) => format!("{:.3}ms", delay.as_secs_f64() * 1000.0),
		None => "-".to_string(),
	};
	match &record.outcome {
		RecordedOutcome::Item(bytes) => format!("{index:>6}  {delay:>12}  item ({} bytes)", bytes.len()),
		RecordedOutcome::Empty => format!("{index:>6}  {delay:>12}  empty"),
	}
}

/// Aggregate counts over a trace stream.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
	pub records: usize,
	pub items: usize,
	pub empties: usize,
	pub payload_bytes: usize,
	pub total_delay: Duration,
}

impl Summary {
	pub fn add(&mut self, record: &TraceRecord) {
		self.records += 1;
		match &record.outcome {
			RecordedOutcome::Item(bytes) => {
				self.items += 1;
				self.payload_bytes += bytes.len();
			}
			RecordedOutcome::Empty => self.empties += 1,
		}
		if let Some(delay) = record.delay {
			self.total_delay = self.total_delay.saturating_add(delay);
		}
	}
}

impl<'a> FromIterator<&'a TraceRecord> for Summary {
	fn from_iter<I: IntoIterator<Item = &'a TraceRecord>>(iter: I) -> Self {
		let mut summary = Self::default();
		for record in iter {
			summary.add(record);
		}
		summary
	}
}

impl fmt::Display for Summary {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		writeln!(f, "records:       {}", self.records)?;
		writeln!(f, "items:         {} ({} payload bytes)", self.items, self.payload_bytes)?;
		writeln!(f, "empty pops:    {}", self.empties)?;
		write!(f, "recorded wait: {:.3}s", self.total_delay.as_secs_f64())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	fn sample() -> Vec<TraceRecord> {
		vec![
			TraceRecord::item_bytes(Some(Duration::from_millis(250)), vec![1, 2, 3]),
			TraceRecord::empty(Some(Duration::from_millis(500))),
			TraceRecord::item_bytes(None, vec![4]),
		]
	}

	#[test]
	fn lines_show_delay_and_outcome() {
		let records = sample();
		assert_eq!(record_line(0, &records[0]), "     0     250.000ms  item (3 bytes)");
		assert_eq!(record_line(1, &records[1]), "     1     500.000ms  empty");
		assert_eq!(record_line(2, &records[2]), "     2             -  item (1 bytes)");
	}

	#[test]
	fn summary_counts_outcomes() {
		let summary: Summary = sample().iter().collect();
		assert_eq!(
			summary,
			Summary {
				records: 3,
				items: 2,
				empties: 1,
				payload_bytes: 4,
				total_delay: Duration::from_millis(750),
			}
		);
		assert_eq!(
			summary.to_string(),
			"records:       3\nitems:         2 (4 payload bytes)\nempty pops:    1\nrecorded wait: 0.750s"
		);
	}

	#[test]
	fn empty_trace_summarizes_to_zero() {
		let summary: Summary = Vec::<TraceRecord>::new().iter().collect();
		assert_eq!(summary, Summary::default());
	}
}
