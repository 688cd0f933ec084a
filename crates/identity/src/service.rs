//! Per-node identity service.
//!
//! [`Identities`] ties together the process-wide uid generator, a name
//! registry and the node's host and scope.

use std::sync::Arc;

use tandem_config::RuntimeOptions;

use crate::display::set_display_format;
use crate::error::{IdentityError, Result};
use crate::name::{NameKey, check_name};
use crate::pid::{ProcessId, TransportAddr};
use crate::registry::NameRegistry;
use crate::uid::UidGenerator;

/// Node-local entry point for minting process identities.
///
/// Shares the process-wide uid generator and the [`NameRegistry`]; pass it
/// to every component that creates processes.
#[derive(Debug, Clone)]
pub struct Identities {
	uids: Arc<UidGenerator>,
	registry: Arc<NameRegistry>,
	host: String,
	scope: String,
	local_pid: u32,
}

impl Identities {
	/// Builds the service from initialized runtime options.
	///
	/// Also applies the configured process-wide display format. Fails with
	/// [`IdentityError::InvalidState`] if the options were not initialized.
	pub fn from_options(options: &RuntimeOptions) -> Result<Self> {
		let host = options.host()?;
		set_display_format(options.pid_format);
		Ok(Self::new(host, options.nodename.clone()))
	}

	/// Creates a service for `host` with naming scope `scope` and a fresh
	/// registry. Uids come from [`UidGenerator::shared`], so services built in
	/// the same process never mint the same uid.
	pub fn new(host: impl Into<String>, scope: impl Into<String>) -> Self {
		Self {
			uids: UidGenerator::shared(),
			registry: Arc::new(NameRegistry::new()),
			host: host.into(),
			scope: scope.into(),
			local_pid: std::process::id(),
		}
	}

	/// Replaces the registry, so several services share one name table.
	#[must_use]
	pub fn with_registry(mut self, registry: Arc<NameRegistry>) -> Self {
		self.registry = registry;
		self
	}

	pub fn registry(&self) -> &Arc<NameRegistry> {
		&self.registry
	}

	pub fn host(&self) -> &str {
		&self.host
	}

	pub fn scope(&self) -> &str {
		&self.scope
	}

	/// Mints a new identity and, when `name` is non-empty, publishes it.
	///
	/// The returned identity is the one that owns the name after
	/// reconciliation, which may be an already published identity rather
	/// than the freshly minted one.
	pub fn create(&self, role: &str, transports: Vec<Option<TransportAddr>>, name: &str) -> Result<ProcessId> {
		if !check_name(name) {
			return Err(IdentityError::InvalidName(name.to_string()));
		}
		let uid = self.uids.generate(&self.host, self.local_pid);
		let pid = ProcessId::new(uid, 1, role, name, self.scope.as_str(), self.host.as_str(), transports);
		if pid.is_anonymous() {
			return Ok(pid);
		}
		Ok(self.registry.publish(pid))
	}

	/// Key for `name` in this node's scope.
	pub fn key(&self, name: &str) -> NameKey {
		NameKey::new(name, self.scope.as_str())
	}

	/// Looks up `name` in this node's scope.
	pub fn lookup(&self, name: &str) -> Option<ProcessId> {
		self.registry.lookup(&self.key(name))
	}
}
