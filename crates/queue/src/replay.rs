//! Trace-driven stand-in for [`crate::WaitableQueue`].

use std::marker::PhantomData;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;

use crate::Inbox;
use crate::error::{QueueError, Result};
use crate::trace::{RecordedOutcome, TraceReader, TraceRecord, TraceSources};

/// Replays a recorded receive trace through the pop contract.
///
/// Every pop consumes exactly one inbound record: it sleeps for the recorded
/// wait, then returns the recorded item or fails with [`QueueError::Empty`],
/// as the live queue did. Once the trace is exhausted (or unreadable) the
/// sources are released and every pop fails with [`QueueError::TraceEnded`].
///
/// There is no `append`: a replay has no live producers.
pub struct ReplayQueue<T> {
	inbound: Mutex<TraceReader>,
	outbound: Mutex<TraceReader>,
	timing: bool,
	_items: PhantomData<fn() -> T>,
}

impl<T> ReplayQueue<T> {
	pub fn new(sources: TraceSources) -> Self {
		Self {
			inbound: Mutex::new(sources.inbound),
			outbound: Mutex::new(sources.outbound),
			timing: true,
			_items: PhantomData,
		}
	}

	/// Enables or disables reproducing the recorded waits.
	#[must_use]
	pub fn with_timing(mut self, timing: bool) -> Self {
		self.timing = timing;
		self
	}

	/// Returns the next raw inbound record without sleeping.
	pub fn next_record(&self) -> Result<TraceRecord> {
		next_from(&self.inbound, "inbound")
	}

	/// Releases both trace sources.
	pub fn close(&self) {
		self.inbound.lock().close();
		self.outbound.lock().close();
	}

	/// Returns true once the inbound trace has been exhausted or closed.
	pub fn is_finished(&self) -> bool {
		self.inbound.lock().is_closed()
	}
}

impl<T: DeserializeOwned> ReplayQueue<T> {
	/// Replays the next recorded pop outcome.
	///
	/// `block` and `timeout` are accepted for signature parity; the recorded
	/// outcome and delay decide the result.
	pub fn pop(&self, _block: bool, _timeout: Option<Duration>) -> Result<T> {
		let record = self.next_record()?;
		if self.timing
			&& let Some(delay) = record.delay
		{
			thread::sleep(delay);
		}
		match record.outcome {
			RecordedOutcome::Item(bytes) => decode_item(&bytes, &self.inbound),
			RecordedOutcome::Empty => Err(QueueError::Empty),
		}
	}

	/// Replays the next recorded outbound item.
	pub fn next_outbound(&self) -> Result<T> {
		match next_from(&self.outbound, "outbound")?.outcome {
			RecordedOutcome::Item(bytes) => decode_item(&bytes, &self.outbound),
			RecordedOutcome::Empty => {
				tracing::debug!("replay.empty_outbound_record");
				self.outbound.lock().close();
				Err(QueueError::TraceEnded)
			}
		}
	}
}

/// Decodes a recorded payload; an undecodable one ends the stream.
fn decode_item<T: DeserializeOwned>(bytes: &[u8], source: &Mutex<TraceReader>) -> Result<T> {
	postcard::from_bytes(bytes).map_err(|err| {
		tracing::debug!(error = %err, "replay.undecodable_item");
		source.lock().close();
		QueueError::TraceEnded
	})
}

fn next_from(source: &Mutex<TraceReader>, stream: &'static str) -> Result<TraceRecord> {
	let mut reader = source.lock();
	match reader.next_record() {
		Ok(Some(record)) => Ok(record),
		Ok(None) => {
			if !reader.is_closed() {
				tracing::debug!(stream, "replay.trace_ended");
			}
			reader.close();
			Err(QueueError::TraceEnded)
		}
		Err(err) => {
			tracing::debug!(stream, error = %err, "replay.trace_unreadable");
			reader.close();
			Err(QueueError::TraceEnded)
		}
	}
}

impl<T: DeserializeOwned> Inbox<T> for ReplayQueue<T> {
	fn pop(&self, block: bool, timeout: Option<Duration>) -> Result<T> {
		ReplayQueue::pop(self, block, timeout)
	}

	fn close(&self) -> Result<()> {
		ReplayQueue::close(self);
		Ok(())
	}
}
