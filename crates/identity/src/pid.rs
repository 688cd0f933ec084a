//! The process identity value type.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::name::NameKey;
use crate::uid::Uid;

/// Port a process listens on for one transport.
pub type TransportAddr = u16;

/// Uniquely identifies one process instance across the deployment.
///
/// Carries everything a peer needs to address the process: its host and the
/// address of every transport it listens on, indexed by the transport's slot.
/// Values are immutable; cloning yields an equal value, never a new identity.
///
/// Processes must treat identities as opaque, comparable keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessId {
	uid: Uid,
	seqno: u32,
	role: String,
	name: String,
	scope: String,
	host: String,
	transports: Vec<Option<TransportAddr>>,
}

impl ProcessId {
	/// Assembles an identity from its fields.
	///
	/// This does not publish anything; use [`crate::Identities::create`] to
	/// mint and register a new process identity.
	pub fn new(
		uid: Uid,
		seqno: u32,
		role: impl Into<String>,
		name: impl Into<String>,
		scope: impl Into<String>,
		host: impl Into<String>,
		transports: Vec<Option<TransportAddr>>,
	) -> Self {
		Self {
			uid,
			seqno,
			role: role.into(),
			name: name.into(),
			scope: scope.into(),
			host: host.into(),
			transports,
		}
	}

	pub fn uid(&self) -> Uid {
		self.uid
	}

	/// Reconciliation sequence number.
	pub fn seqno(&self) -> u32 {
		self.seqno
	}

	/// Logical process type, used for display only.
	pub fn role(&self) -> &str {
		&self.role
	}

	/// Process name, empty for anonymous processes.
	pub fn name(&self) -> &str {
		&self.name
	}

	/// Naming scope (the node name) the process name is unique within.
	pub fn scope(&self) -> &str {
		&self.scope
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn transports(&self) -> &[Option<TransportAddr>] {
		&self.transports
	}

	pub fn is_anonymous(&self) -> bool {
		self.name.is_empty()
	}

	/// Registry key of a named identity.
	pub fn name_key(&self) -> Option<NameKey> {
		(!self.is_anonymous()).then(|| NameKey::new(self.name.clone(), self.scope.clone()))
	}

	/// Returns the host-qualified address for the transport in `slot`.
	///
	/// `None` when the process never published an address for that slot.
	pub fn address_for(&self, slot: usize) -> Option<(&str, TransportAddr)> {
		let addr = (*self.transports.get(slot)?)?;
		Some((self.host.as_str(), addr))
	}

	/// Returns true when the scope adds information beyond the name.
	pub(crate) fn is_scope_qualified(&self) -> bool {
		!self.scope.is_empty() && self.scope != self.name
	}
}

/// Total order over identities, compared field by field:
///
/// 1. `uid`, so ordering roughly follows creation time;
/// 2. `seqno`;
/// 3. `role`, `name`, `scope` and `host`, lexicographically;
/// 4. `transports`, element-wise with an absent slot sorting first.
///
/// Name reconciliation relies on this order: a newly created identity that
/// sorts below the published one for the same name loses.
impl Ord for ProcessId {
	fn cmp(&self, other: &Self) -> Ordering {
		self.uid
			.cmp(&other.uid)
			.then_with(|| self.seqno.cmp(&other.seqno))
			.then_with(|| self.role.cmp(&other.role))
			.then_with(|| self.name.cmp(&other.name))
			.then_with(|| self.scope.cmp(&other.scope))
			.then_with(|| self.host.cmp(&other.host))
			.then_with(|| self.transports.cmp(&other.transports))
	}
}

impl PartialOrd for ProcessId {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
