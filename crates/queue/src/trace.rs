//! Trace stream format.
//!
//! A trace is a pair of byte streams, inbound (every pop outcome) and
//! outbound (every recorded send). Each stream is a sequence of frames: a
//! little-endian `u32` length followed by a postcard-encoded
//! [`TraceRecord`]. Item payloads are nested as their own postcard bytes so a
//! trace can be walked without knowing the payload type.
//!
//! The format is internal and not stable across versions.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on a single frame, to reject garbage lengths early.
const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Outcome of one recorded pop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordedOutcome {
	/// An item was delivered; holds its postcard encoding.
	Item(Vec<u8>),
	/// The pop failed because the queue was empty.
	Empty,
}

/// One entry of a trace stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRecord {
	/// Time spent waiting, when the pop blocked with a finite timeout.
	pub delay: Option<Duration>,
	pub outcome: RecordedOutcome,
}

impl TraceRecord {
	/// Records a delivered item.
	pub fn item<T: Serialize + ?Sized>(delay: Option<Duration>, item: &T) -> io::Result<Self> {
		let bytes = postcard::to_stdvec(item).map_err(invalid_data)?;
		Ok(Self::item_bytes(delay, bytes))
	}

	/// Records a delivered item from its already encoded payload.
	pub const fn item_bytes(delay: Option<Duration>, bytes: Vec<u8>) -> Self {
		Self {
			delay,
			outcome: RecordedOutcome::Item(bytes),
		}
	}

	/// Records an empty pop.
	pub const fn empty(delay: Option<Duration>) -> Self {
		Self {
			delay,
			outcome: RecordedOutcome::Empty,
		}
	}

	pub fn is_empty_outcome(&self) -> bool {
		self.outcome == RecordedOutcome::Empty
	}

	/// Decodes the delivered item; `None` for an empty outcome.
	pub fn decode<T: DeserializeOwned>(&self) -> io::Result<Option<T>> {
		match &self.outcome {
			RecordedOutcome::Item(bytes) => postcard::from_bytes(bytes).map(Some).map_err(invalid_data),
			RecordedOutcome::Empty => Ok(None),
		}
	}
}

/// Writes one length-prefixed frame.
pub fn write_frame(out: &mut impl Write, record: &TraceRecord) -> io::Result<()> {
	let buf = postcard::to_stdvec(record).map_err(invalid_data)?;
	let len = u32::try_from(buf.len()).ok().filter(|len| *len <= MAX_FRAME_LEN).ok_or_else(|| invalid_data("trace frame too large"))?;
	out.write_all(&len.to_le_bytes())?;
	out.write_all(&buf)
}

/// Reads one frame. `Ok(None)` at a clean end of stream.
pub fn read_frame(input: &mut impl Read) -> io::Result<Option<TraceRecord>> {
	let mut len = [0u8; 4];
	let mut filled = 0;
	while filled < len.len() {
		match input.read(&mut len[filled..]) {
			Ok(0) if filled == 0 => return Ok(None),
			Ok(0) => return Err(ErrorKind::UnexpectedEof.into()),
			Ok(n) => filled += n,
			Err(e) if e.kind() == ErrorKind::Interrupted => {}
			Err(e) => return Err(e),
		}
	}
	let len = u32::from_le_bytes(len);
	if len > MAX_FRAME_LEN {
		return Err(invalid_data("trace frame too large"));
	}
	let mut buf = vec![0u8; len as usize];
	input.read_exact(&mut buf)?;
	postcard::from_bytes(&buf).map(Some).map_err(invalid_data)
}

fn invalid_data(err: impl std::fmt::Display) -> io::Error {
	io::Error::new(ErrorKind::InvalidData, err.to_string())
}

/// Paths of the inbound and outbound streams for `stem` inside `dir`.
pub fn trace_paths(dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
	(dir.join(format!("{stem}.trace.in")), dir.join(format!("{stem}.trace.out")))
}

/// Buffered, closable trace output stream.
pub struct TraceWriter {
	inner: Option<BufWriter<Box<dyn Write + Send>>>,
}

impl TraceWriter {
	pub fn new(out: impl Write + Send + 'static) -> Self {
		Self {
			inner: Some(BufWriter::new(Box::new(out))),
		}
	}

	/// Appends and flushes one record. Writes after close are skipped.
	pub fn write(&mut self, record: &TraceRecord) -> io::Result<()> {
		let Some(out) = self.inner.as_mut() else {
			return Ok(());
		};
		write_frame(out, record)?;
		out.flush()
	}

	/// Flushes and releases the stream.
	pub fn close(&mut self) -> io::Result<()> {
		match self.inner.take() {
			Some(mut out) => out.flush(),
			None => Ok(()),
		}
	}

	pub fn is_closed(&self) -> bool {
		self.inner.is_none()
	}
}

/// Buffered, closable trace input stream.
pub struct TraceReader {
	inner: Option<BufReader<Box<dyn Read + Send>>>,
}

impl TraceReader {
	pub fn new(input: impl Read + Send + 'static) -> Self {
		Self {
			inner: Some(BufReader::new(Box::new(input))),
		}
	}

	/// Opens a trace stream file.
	pub fn open(path: &Path) -> io::Result<Self> {
		Ok(Self::new(File::open(path)?))
	}

	/// Reads the next record. A closed reader behaves like an exhausted one.
	pub fn next_record(&mut self) -> io::Result<Option<TraceRecord>> {
		match self.inner.as_mut() {
			Some(input) => read_frame(input),
			None => Ok(None),
		}
	}

	pub fn close(&mut self) {
		self.inner = None;
	}

	pub fn is_closed(&self) -> bool {
		self.inner.is_none()
	}
}

impl Iterator for TraceReader {
	type Item = io::Result<TraceRecord>;

	fn next(&mut self) -> Option<Self::Item> {
		let next = self.next_record();
		if !matches!(next, Ok(Some(_))) {
			self.close();
		}
		next.transpose()
	}
}

/// Output streams a recording queue writes to.
pub struct TraceSinks {
	pub(crate) inbound: TraceWriter,
	pub(crate) outbound: TraceWriter,
}

impl TraceSinks {
	pub fn new(inbound: impl Write + Send + 'static, outbound: impl Write + Send + 'static) -> Self {
		Self {
			inbound: TraceWriter::new(inbound),
			outbound: TraceWriter::new(outbound),
		}
	}

	/// Creates (truncating) the trace files for `stem` in `dir`.
	pub fn create(dir: &Path, stem: &str) -> io::Result<Self> {
		let (inbound, outbound) = trace_paths(dir, stem);
		Ok(Self::new(File::create(inbound)?, File::create(outbound)?))
	}
}

/// Input streams a replay queue reads from.
pub struct TraceSources {
	pub(crate) inbound: TraceReader,
	pub(crate) outbound: TraceReader,
}

impl TraceSources {
	pub fn new(inbound: impl Read + Send + 'static, outbound: impl Read + Send + 'static) -> Self {
		Self {
			inbound: TraceReader::new(inbound),
			outbound: TraceReader::new(outbound),
		}
	}

	/// Opens the trace files recorded for `stem` in `dir`.
	pub fn open(dir: &Path, stem: &str) -> io::Result<Self> {
		let (inbound, outbound) = trace_paths(dir, stem);
		Ok(Self::new(File::open(inbound)?, File::open(outbound)?))
	}
}
