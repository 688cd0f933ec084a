//! Runtime options for tandem nodes.
//!
//! Every process on a node reads the same small set of options: the hostname
//! that goes into each process identity, the node name that scopes process
//! names, the display format for identities, and whether receive traces are
//! recorded. Options are written in TOML:
//!
//! ```toml
//! hostname = "10.0.0.7"
//! nodename = "alpha"
//! pid_format = "long"
//! record_trace = true
//! logdir = "/var/log/tandem"
//!
//! [log]
//! console_level = "debug"
//! ```
//!
//! Options must be [initialized](RuntimeOptions::initialize) before the
//! identity subsystem can use them. Initialization resolves the hostname to
//! the canonical address every node in the deployment must agree on.

pub mod error;

use std::net::{IpAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

pub use error::{ConfigError, Result};
use serde::Deserialize;

/// Textual form used when a process identity is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PidFormat {
	/// Role plus name, or the last five hex digits of the uid.
	#[default]
	Short,
	/// Role plus name, or the full hex uid.
	Long,
	/// Every field, for debugging.
	Full,
}

/// Verbosity threshold for console logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
	Error,
	Warn,
	#[default]
	Info,
	Debug,
	Trace,
}

impl LogLevel {
	/// Converts to the matching `tracing` level.
	pub const fn as_tracing_level(self) -> tracing::Level {
		match self {
			Self::Error => tracing::Level::ERROR,
			Self::Warn => tracing::Level::WARN,
			Self::Info => tracing::Level::INFO,
			Self::Debug => tracing::Level::DEBUG,
			Self::Trace => tracing::Level::TRACE,
		}
	}
}

/// Logging section of the runtime options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogOptions {
	/// Disables log output entirely.
	pub no_log: bool,
	/// Threshold for console output.
	pub console_level: LogLevel,
}

/// Node-wide runtime options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeOptions {
	/// Hostname or address other nodes use to reach this one.
	///
	/// When unset, the system hostname is used for named nodes and
	/// `localhost` otherwise.
	pub hostname: Option<String>,
	/// Name of this node. Process names are unique within a node.
	pub nodename: String,
	/// Display format for process identities.
	pub pid_format: PidFormat,
	/// Records receive traces of every process queue.
	pub record_trace: bool,
	/// Directory receiving logs and traces.
	pub logdir: Option<PathBuf>,
	/// Logging options.
	pub log: LogOptions,
	#[serde(skip)]
	resolved_host: Option<String>,
}

impl RuntimeOptions {
	/// Parses options from a TOML document.
	pub fn from_toml_str(src: &str) -> Result<Self> {
		Ok(toml::from_str(src)?)
	}

	/// Reads and parses an options file.
	pub fn load(path: &Path) -> Result<Self> {
		let src = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&src)
	}

	/// Validates the options and resolves the canonical hostname.
	///
	/// Creates `logdir` when trace recording is enabled. Calling this again
	/// re-resolves the hostname.
	pub fn initialize(&mut self) -> Result<()> {
		if self.record_trace {
			let Some(logdir) = self.logdir.as_ref() else {
				return Err(ConfigError::MissingLogdir);
			};
			std::fs::create_dir_all(logdir).map_err(|error| ConfigError::Logdir {
				path: logdir.clone(),
				error,
			})?;
		}

		let hostname = match self.hostname.as_deref() {
			Some(host) => host.to_string(),
			None if !self.nodename.is_empty() => sysinfo::System::host_name().unwrap_or_else(|| "localhost".to_string()),
			None => "localhost".to_string(),
		};
		let resolved = resolve_host(&hostname)?;
		tracing::debug!(hostname = %hostname, resolved = %resolved, nodename = %self.nodename, "options.initialize");
		self.resolved_host = Some(resolved.to_string());
		Ok(())
	}

	/// Returns true once [`Self::initialize`] succeeded.
	pub fn is_initialized(&self) -> bool {
		self.resolved_host.is_some()
	}

	/// Returns the resolved canonical host address.
	pub fn host(&self) -> Result<&str> {
		self.resolved_host
			.as_deref()
			.ok_or(ConfigError::InvalidState("hostname has not been resolved"))
	}

	/// Returns the directory traces are written to, when recording is enabled.
	pub fn trace_dir(&self) -> Result<Option<&Path>> {
		if !self.is_initialized() {
			return Err(ConfigError::InvalidState("trace directory requested before initialization"));
		}
		Ok(if self.record_trace { self.logdir.as_deref() } else { None })
	}
}

/// Resolves `hostname`, preferring an IPv4 address.
fn resolve_host(hostname: &str) -> Result<IpAddr> {
	let unresolvable = |error| ConfigError::UnresolvableHost {
		hostname: hostname.to_string(),
		error,
	};
	let addrs: Vec<_> = (hostname, 0u16).to_socket_addrs().map_err(unresolvable)?.map(|addr| addr.ip()).collect();
	addrs
		.iter()
		.find(|ip| ip.is_ipv4())
		.or_else(|| addrs.first())
		.copied()
		.ok_or_else(|| unresolvable(std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses")))
}

/// Packs the crate version into four bytes: major, minor, patch and a
/// checksum of the pre-release tag.
pub fn version_bytes() -> [u8; 4] {
	let part = |s: &str| s.parse::<u64>().map_or(0, |v| (v & 0xff) as u8);
	let pre = env!("CARGO_PKG_VERSION_PRE").bytes().fold(0u8, |acc, b| acc.wrapping_add(b));
	[
		part(env!("CARGO_PKG_VERSION_MAJOR")),
		part(env!("CARGO_PKG_VERSION_MINOR")),
		part(env!("CARGO_PKG_VERSION_PATCH")),
		pre,
	]
}
