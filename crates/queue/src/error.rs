//! Queue error conditions.

use std::io;

use thiserror::Error;

/// Why a pop did not return an item.
#[derive(Debug, Error)]
pub enum QueueError {
	/// Nothing was available in time. Transient; expected while polling.
	#[error("queue is empty")]
	Empty,

	/// A replay queue consumed its whole trace. Terminal for that queue.
	#[error("no more items in receive trace")]
	TraceEnded,

	/// Writing the trace failed. The trace streams are closed.
	#[error("trace I/O failed: {0}")]
	Trace(#[from] io::Error),
}

impl QueueError {
	/// Returns true for [`QueueError::Empty`].
	pub fn is_empty(&self) -> bool {
		matches!(self, Self::Empty)
	}

	/// Returns true for [`QueueError::TraceEnded`].
	pub fn is_trace_ended(&self) -> bool {
		matches!(self, Self::TraceEnded)
	}
}

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;
