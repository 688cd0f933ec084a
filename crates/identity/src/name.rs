//! Process name syntax and registry keys.
//!
//! A fully qualified process address reads `name#node@host:port`. The `#`,
//! `@` and `:` separators are therefore reserved and may not appear in a
//! process name.

use std::fmt;

use serde::{Deserialize, Serialize};

const RESERVED: [char; 3] = ['@', '#', ':'];

/// Returns true if `name` contains none of the reserved separators.
pub fn check_name(name: &str) -> bool {
	!name.contains(RESERVED)
}

/// Components of a `name@host:port` address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAddress<'a> {
	pub name: &'a str,
	pub host: Option<&'a str>,
	pub port: Option<u16>,
}

/// Splits `name@host:port` into its components.
///
/// The host and port parts are optional. Returns `None` for more than one
/// `@`, more than one `:`, or a port that is not a number.
pub fn split_host(addr: &str) -> Option<HostAddress<'_>> {
	let Some((name, suffix)) = addr.split_once('@') else {
		return Some(HostAddress { name: addr, host: None, port: None });
	};
	if suffix.contains('@') {
		return None;
	}
	let (host, port) = match suffix.split_once(':') {
		Some((_, port)) if port.contains(':') => return None,
		Some((host, port)) => (host, Some(port.parse::<u16>().ok()?)),
		None => (suffix, None),
	};
	Some(HostAddress {
		name,
		host: (!host.is_empty()).then_some(host),
		port,
	})
}

/// Splits `name#node` into process name and node name.
///
/// A bare name doubles as its own node name. Returns `None` if the input
/// still carries a host part or has more than one `#`.
pub fn split_node(name: &str) -> Option<(&str, &str)> {
	if name.contains('@') {
		return None;
	}
	match name.split_once('#') {
		Some((_, node)) if node.contains('#') => None,
		Some((proc_name, node)) => Some((proc_name, node)),
		None => Some((name, name)),
	}
}

/// Registry key: a process name qualified by its naming scope.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameKey {
	pub name: String,
	pub scope: String,
}

impl NameKey {
	pub fn new(name: impl Into<String>, scope: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			scope: scope.into(),
		}
	}
}

impl fmt::Display for NameKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}#{}", self.name, self.scope)
	}
}
