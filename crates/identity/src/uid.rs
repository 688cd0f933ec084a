//! Coordination-free unique id generation.
//!
//! A [`Uid`] packs 96 bits, high to low:
//!
//! | bits | field |
//! |------|-------|
//! | 54   | milliseconds since the Unix epoch |
//! | 16   | hash of the hostname, folded to 16 bits |
//! | 16   | local process id modulo 65535 |
//! | 10   | per-generator counter modulo 1024 |
//!
//! The timestamp dominates so ids are roughly time ordered. The counter wraps
//! silently at 1024; two ids minted by one generator inside the same
//! millisecond more than 1023 calls apart would collide. This is a known
//! approximation, not a uniqueness guarantee.
//!
//! Every id minted in one OS process must come from the same counter, so
//! callers share [`UidGenerator::shared`] rather than building their own.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

const TIMESTAMP_BITS: u32 = 54;
const HOST_SHIFT: u32 = 26;
const PID_SHIFT: u32 = 10;
const TIMESTAMP_SHIFT: u32 = 42;
const COUNTER_MODULUS: u16 = 1024;

/// A 96-bit globally unique process id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Uid(u128);

impl Uid {
	/// Wraps a raw value. Bits above 96 are kept as-is.
	pub const fn from_raw(raw: u128) -> Self {
		Self(raw)
	}

	/// Returns the raw value.
	pub const fn as_u128(self) -> u128 {
		self.0
	}

	/// Composes a uid from its fields, truncating each to its width.
	pub const fn compose(timestamp_ms: u64, host_hash: u16, local_pid: u32, counter: u16) -> Self {
		let ts = (timestamp_ms as u128) & ((1u128 << TIMESTAMP_BITS) - 1);
		let pid = (local_pid % 0xffff) as u128;
		let cnt = (counter % COUNTER_MODULUS) as u128;
		Self((ts << TIMESTAMP_SHIFT) | ((host_hash as u128) << HOST_SHIFT) | (pid << PID_SHIFT) | cnt)
	}

	/// Splits the uid back into its fields.
	pub const fn parts(self) -> UidParts {
		UidParts {
			timestamp_ms: (self.0 >> TIMESTAMP_SHIFT) as u64 & ((1u64 << TIMESTAMP_BITS) - 1),
			host_hash: (self.0 >> HOST_SHIFT) as u16,
			local_pid: (self.0 >> PID_SHIFT) as u16,
			counter: (self.0 as u16) & (COUNTER_MODULUS - 1),
		}
	}
}

impl fmt::LowerHex for Uid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::LowerHex::fmt(&self.0, f)
	}
}

impl fmt::Display for Uid {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:x}", self.0)
	}
}

/// Decomposed fields of a [`Uid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UidParts {
	pub timestamp_ms: u64,
	pub host_hash: u16,
	pub local_pid: u16,
	pub counter: u16,
}

/// Mints [`Uid`]s for one OS process.
#[derive(Debug, Default)]
pub struct UidGenerator {
	counter: Mutex<u16>,
}

impl UidGenerator {
	/// Creates a generator whose first id carries counter value 1.
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the generator shared by every minting site in this process.
	pub fn shared() -> Arc<Self> {
		static SHARED: OnceLock<Arc<UidGenerator>> = OnceLock::new();
		Arc::clone(SHARED.get_or_init(|| Arc::new(Self::new())))
	}

	/// Mints a uid for `host` and `local_pid` at the current wall-clock time.
	pub fn generate(&self, host: &str, local_pid: u32) -> Uid {
		self.generate_at(now_millis(), host, local_pid)
	}

	/// Mints a uid with an explicit timestamp.
	pub fn generate_at(&self, timestamp_ms: u64, host: &str, local_pid: u32) -> Uid {
		let counter = {
			let mut counter = self.counter.lock();
			*counter = (*counter + 1) % COUNTER_MODULUS;
			*counter
		};
		Uid::compose(timestamp_ms, host_hash(host), local_pid, counter)
	}
}

/// Hashes `host` and xor-folds the 64-bit digest to 16 bits.
pub fn host_hash(host: &str) -> u16 {
	let mut hasher = FxHasher::default();
	host.hash(&mut hasher);
	let digest = hasher.finish();
	(digest ^ (digest >> 16) ^ (digest >> 32) ^ (digest >> 48)) as u16
}

fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map_or(0, |elapsed| elapsed.as_millis() as u64)
}
