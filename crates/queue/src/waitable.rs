//! Blocking FIFO queue used as every process's inbox.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;

use crate::Inbox;
use crate::error::{QueueError, Result};
use crate::trace::{TraceRecord, TraceSinks};

struct QueueState<T> {
	items: VecDeque<T>,
	/// Poppers currently parked on the condvar.
	waiting: usize,
	/// Bumped by every append that wakes waiters, so a waiter can tell a real
	/// wakeup from a spurious one.
	epoch: u64,
	/// Sequence number handed to the next pop outcome.
	next_seq: u64,
}

impl<T> QueueState<T> {
	fn settle(&mut self, outcome: Option<T>) -> (u64, Result<T>) {
		let seq = self.next_seq;
		self.next_seq += 1;
		(seq, outcome.ok_or(QueueError::Empty))
	}
}

/// Writes pop outcomes in the order they were settled under the queue lock.
struct Recorder<T> {
	sinks: TraceSinks,
	encode: fn(&T) -> postcard::Result<Vec<u8>>,
	/// Sequence number of the next outcome to write.
	next_seq: u64,
	/// Outcomes settled ahead of a popper that has not recorded yet.
	held: BTreeMap<u64, TraceRecord>,
}

impl<T> Recorder<T> {
	fn record_pop(&mut self, seq: u64, delay: Option<Duration>, outcome: &Result<T>) -> io::Result<()> {
		let record = match outcome {
			Ok(item) => TraceRecord::item_bytes(delay, self.encode_item(item)?),
			Err(_) => TraceRecord::empty(delay),
		};
		self.held.insert(seq, record);
		while let Some(record) = self.held.remove(&self.next_seq) {
			self.sinks.inbound.write(&record)?;
			self.next_seq += 1;
		}
		Ok(())
	}

	fn record_send(&mut self, item: &T) -> io::Result<()> {
		let record = TraceRecord::item_bytes(None, self.encode_item(item)?);
		self.sinks.outbound.write(&record)
	}

	fn encode_item(&self, item: &T) -> io::Result<Vec<u8>> {
		(self.encode)(item).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))
	}

	fn close(&mut self) -> io::Result<()> {
		if !self.held.is_empty() {
			tracing::debug!(dropped = self.held.len(), "queue.trace_unsettled");
		}
		self.held.clear();
		let inbound = self.sinks.inbound.close();
		let outbound = self.sinks.outbound.close();
		inbound.and(outbound)
	}
}

/// Multi-producer, multi-consumer FIFO with blocking pops.
///
/// `append` never blocks. A bounded queue evicts its oldest items to stay
/// within its maximum length. `pop` returns the head immediately when there
/// is one; otherwise it parks until an append wakes it or the timeout runs
/// out, then retries once. A woken popper that loses the item to a racing
/// popper fails with [`QueueError::Empty`].
///
/// With trace sinks attached every pop outcome, including empty ones, is
/// recorded so a [`crate::ReplayQueue`] can reproduce the receive side.
/// Outcomes are numbered while the queue lock is held and written in that
/// order, so the trace matches the dequeue order even with several
/// concurrent poppers.
pub struct WaitableQueue<T> {
	state: Mutex<QueueState<T>>,
	ready: Condvar,
	maxlen: Option<usize>,
	recorder: Mutex<Option<Recorder<T>>>,
}

impl<T> Default for WaitableQueue<T> {
	fn default() -> Self {
		Self::with_maxlen(None)
	}
}

impl<T> WaitableQueue<T> {
	/// Creates an unbounded queue.
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a queue keeping at most the `maxlen` most recent items.
	pub fn bounded(maxlen: usize) -> Self {
		Self::with_maxlen(Some(maxlen))
	}

	fn with_maxlen(maxlen: Option<usize>) -> Self {
		Self {
			state: Mutex::new(QueueState {
				items: VecDeque::new(),
				waiting: 0,
				epoch: 0,
				next_seq: 0,
			}),
			ready: Condvar::new(),
			maxlen,
			recorder: Mutex::new(None),
		}
	}

	/// Appends `item`, evicting the oldest items of a full bounded queue.
	pub fn append(&self, item: T) {
		let mut state = self.state.lock();
		state.items.push_back(item);
		if let Some(maxlen) = self.maxlen {
			while state.items.len() > maxlen {
				let _ = state.items.pop_front();
			}
		}
		if state.waiting > 0 {
			state.epoch = state.epoch.wrapping_add(1);
			drop(state);
			self.ready.notify_all();
		}
	}

	/// Removes and returns the head of the queue.
	///
	/// Fails with [`QueueError::Empty`] when no item is available and
	/// `block` is false, `timeout` is zero, or `timeout` elapsed. `None`
	/// waits without limit. When recording, a failed trace write closes the
	/// trace, puts the dequeued item back at the head of the queue and
	/// surfaces as [`QueueError::Trace`]; the next pop delivers the item.
	pub fn pop(&self, block: bool, timeout: Option<Duration>) -> Result<T> {
		if !self.is_recording() {
			return self.pop_live(block, timeout).1;
		}

		let started = (block && timeout.is_some_and(|t| !t.is_zero())).then(Instant::now);
		let (seq, outcome) = self.pop_live(block, timeout);
		let delay = started.map(|at| at.elapsed());

		let failed = {
			let mut recorder = self.recorder.lock();
			match recorder.as_mut().map(|rec| rec.record_pop(seq, delay, &outcome)) {
				Some(Err(err)) => {
					tracing::warn!(error = %err, "queue.trace_write_failed");
					if let Some(mut rec) = recorder.take() {
						let _ = rec.close();
					}
					Some(err)
				}
				_ => None,
			}
		};
		match failed {
			Some(err) => {
				if let Ok(item) = outcome {
					self.requeue(item);
				}
				Err(QueueError::Trace(err))
			}
			None => outcome,
		}
	}

	/// Returns an undelivered item to the head of the queue.
	fn requeue(&self, item: T) {
		let mut state = self.state.lock();
		state.items.push_front(item);
		if let Some(maxlen) = self.maxlen {
			while state.items.len() > maxlen {
				let _ = state.items.pop_front();
			}
		}
		if state.waiting > 0 {
			state.epoch = state.epoch.wrapping_add(1);
			drop(state);
			self.ready.notify_all();
		}
	}

	fn pop_live(&self, block: bool, timeout: Option<Duration>) -> (u64, Result<T>) {
		let mut state = self.state.lock();
		if let Some(item) = state.items.pop_front() {
			return state.settle(Some(item));
		}
		if !block || timeout == Some(Duration::ZERO) {
			return state.settle(None);
		}

		let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
		let epoch = state.epoch;
		state.waiting += 1;
		tracing::trace!(waiting = state.waiting, ?timeout, "queue.wait");
		while state.epoch == epoch {
			match deadline {
				Some(deadline) => {
					if self.ready.wait_until(&mut state, deadline).timed_out() {
						break;
					}
				}
				None => self.ready.wait(&mut state),
			}
		}
		state.waiting -= 1;
		let item = state.items.pop_front();
		state.settle(item)
	}

	/// Records `item` on the outbound trace stream, if recording.
	pub fn record_outbound(&self, item: &T) -> Result<()> {
		let mut recorder = self.recorder.lock();
		let Some(rec) = recorder.as_mut() else {
			return Ok(());
		};
		if let Err(err) = rec.record_send(item) {
			let _ = rec.close();
			*recorder = None;
			return Err(QueueError::Trace(err));
		}
		Ok(())
	}

	/// Flushes and releases the trace sinks. Later pops are not recorded.
	pub fn close(&self) -> Result<()> {
		let rec = self.recorder.lock().take();
		match rec {
			Some(mut rec) => Ok(rec.close()?),
			None => Ok(()),
		}
	}

	pub fn is_recording(&self) -> bool {
		self.recorder.lock().is_some()
	}

	pub fn len(&self) -> usize {
		self.state.lock().items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.state.lock().items.is_empty()
	}

	/// Maximum length of a bounded queue.
	pub fn maxlen(&self) -> Option<usize> {
		self.maxlen
	}
}

impl<T: Serialize> WaitableQueue<T> {
	/// Records every pop outcome to `sinks` from now on.
	#[must_use]
	pub fn with_trace(self, sinks: TraceSinks) -> Self {
		let next_seq = self.state.lock().next_seq;
		*self.recorder.lock() = Some(Recorder {
			sinks,
			encode: postcard::to_stdvec::<T>,
			next_seq,
			held: BTreeMap::new(),
		});
		self
	}
}

impl<T> Extend<T> for WaitableQueue<T> {
	fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
		for item in iter {
			self.append(item);
		}
	}
}

impl<T> Drop for WaitableQueue<T> {
	fn drop(&mut self) {
		if let Some(mut rec) = self.recorder.get_mut().take() {
			let _ = rec.close();
		}
	}
}

impl<T: Send> Inbox<T> for WaitableQueue<T> {
	fn pop(&self, block: bool, timeout: Option<Duration>) -> Result<T> {
		WaitableQueue::pop(self, block, timeout)
	}

	fn close(&self) -> Result<()> {
		WaitableQueue::close(self)
	}
}
