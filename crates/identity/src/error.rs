//! Error types for identity creation.

use tandem_config::ConfigError;
use thiserror::Error;

/// Errors returned by the identity service.
#[derive(Debug, Error)]
pub enum IdentityError {
	/// The service was used before the runtime options were initialized.
	#[error("identity subsystem used before initialization: {0}")]
	InvalidState(&'static str),

	/// A process name contains one of the reserved characters `@`, `#`, `:`.
	#[error("invalid process name '{0}': names may not contain '@', '#' or ':'")]
	InvalidName(String),

	/// Any other option error surfaced while building the service.
	#[error(transparent)]
	Config(ConfigError),
}

impl From<ConfigError> for IdentityError {
	fn from(err: ConfigError) -> Self {
		match err {
			ConfigError::InvalidState(what) => Self::InvalidState(what),
			other => Self::Config(other),
		}
	}
}

/// Result type for identity operations.
pub type Result<T> = std::result::Result<T, IdentityError>;
