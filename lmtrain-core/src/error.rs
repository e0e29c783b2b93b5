use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type LmResult<T> = Result<T, LmError>;

/// Errors raised while configuring or training a language model.
///
/// No variant is retried internally: the first failure aborts the job and
/// leaves any partial artifacts on disk.
#[derive(Debug, Error)]
pub enum LmError {
	/// A model already exists at the target path. Training never overwrites.
	#[error("Model already exists at {}", path.display())]
	Precondition { path: PathBuf },

	/// The requested model kind is not one of the known variants.
	#[error("Invalid language model type: {0}")]
	UnknownVariant(String),

	#[error("Invalid configuration: {0}")]
	ConfigValidation(String),

	/// Memory statistics could not be read. Callers fall back to the minimum budget.
	#[error("Unable to compute resource budget: {0}")]
	ResourceComputation(String),

	#[error("{} exited with status {status}", program.display())]
	ExternalProcess { program: PathBuf, status: String },

	#[error("Failed to launch {}: {source}", program.display())]
	Spawn {
		program: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Invalid settings file: {0}")]
	ConfigParse(#[from] toml::de::Error),
}
