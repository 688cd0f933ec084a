//! Process inboxes for the tandem runtime.
//!
//! [`WaitableQueue`] is the live inbox: a blocking multi-producer,
//! multi-consumer FIFO that can record every pop outcome to a trace.
//! [`ReplayQueue`] reads such a trace back and reproduces the same outcomes
//! (and waits) without any producers, which makes a process's receive side
//! deterministic for debugging.
//!
//! Process loops should be written against [`Inbox`] so they run unchanged
//! on either.

use std::time::Duration;

pub mod error;
mod replay;
pub mod trace;
mod waitable;

pub use error::{QueueError, Result};
pub use replay::ReplayQueue;
pub use trace::{RecordedOutcome, TraceReader, TraceRecord, TraceSinks, TraceSources, TraceWriter, trace_paths};
pub use waitable::WaitableQueue;

/// Receive side shared by live and replayed inboxes.
pub trait Inbox<T>: Send + Sync {
	/// Removes the next item. See [`WaitableQueue::pop`] for the semantics of
	/// `block` and `timeout`.
	fn pop(&self, block: bool, timeout: Option<Duration>) -> Result<T>;

	/// Releases any trace streams held by the inbox.
	fn close(&self) -> Result<()>;
}
