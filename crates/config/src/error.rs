//! Error types for runtime option handling.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or initializing runtime options.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Options were read before [`crate::RuntimeOptions::initialize`] ran.
	#[error("tandem runtime is not initialized: {0}")]
	InvalidState(&'static str),

	/// Error reading an options file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or an unknown option value.
	#[error("options parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// The configured (or detected) hostname does not resolve to an address.
	#[error("\"{hostname}\" is not a resolvable hostname; pass an IP address or a reachable name instead")]
	UnresolvableHost {
		/// Hostname that failed to resolve.
		hostname: String,
		/// The underlying resolver error.
		#[source]
		error: std::io::Error,
	},

	/// Trace recording was requested without a log directory to write into.
	#[error("'record_trace' enabled without setting 'logdir'")]
	MissingLogdir,

	/// The log directory could not be created.
	#[error("failed to create log directory {path}: {error}")]
	Logdir {
		/// Directory that could not be created.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Result type for option operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
