//! Language model variants and their construction.
//!
//! This module provides:
//! - The shared training contract (`Trainer`, `TrainingJob`, `Stage`)
//! - One backend per engine (`KenLm`, `IrstLm`)
//! - The composite background + domain model (`MultiplexedLm`)
//! - `LanguageModel`, the closed set of variants built from a kind name

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::LmConfig;
use crate::corpus::Corpus;
use crate::error::{LmError, LmResult};
use crate::io::relative_to;
use crate::shell::{LogSink, Toolchain};

/// Shared training steps and job state.
pub mod training;

/// Primary engine backend.
///
/// Counting with a memory budget and optional singleton pruning, then binarization.
pub mod kenlm;

/// Adaptive-smoothing engine backend.
pub mod irstlm;

/// Background model plus per-domain models, blended at decode time.
pub mod multiplexed;

pub use irstlm::IrstLm;
pub use kenlm::KenLm;
pub use multiplexed::MultiplexedLm;
pub use training::{Stage, Trainer};

/// Model kinds a caller can request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelKind {
	Primary,
	Adaptive,
	Multiplexed,
}

impl ModelKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Primary => "primary",
			Self::Adaptive => "adaptive",
			Self::Multiplexed => "multiplexed",
		}
	}
}

impl fmt::Display for ModelKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ModelKind {
	type Err = LmError;

	/// Parses a kind name, case-insensitively. Engine names are accepted too
	/// (`kenlm`, `irstlm`, `muxlm`).
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"primary" | "kenlm" => Ok(Self::Primary),
			"adaptive" | "irstlm" | "staticirstlm" => Ok(Self::Adaptive),
			"multiplexed" | "muxlm" | "multiplexedlm" => Ok(Self::Multiplexed),
			_ => Err(LmError::UnknownVariant(s.to_owned())),
		}
	}
}

/// A language model of one of the supported kinds.
///
/// # Lifecycle
/// - Built once by `instantiate`, immutable afterwards
/// - `train` is meant to run at most once: a second run finds the artifact
///   and fails with `Precondition`
/// - `iniline` only needs the declared path and parameters, so pre-trained
///   models can be referenced without training
#[derive(Clone, Debug)]
pub enum LanguageModel {
	Primary(KenLm),
	Adaptive(IrstLm),
	Multiplexed(MultiplexedLm),
}

impl LanguageModel {
	/// Builds the model of `kind` writing to `model_path`.
	///
	/// # Errors
	/// Returns `ConfigValidation` if `config` is out of range.
	pub fn instantiate<P: Into<PathBuf>>(kind: ModelKind, model_path: P, config: &LmConfig, toolchain: Toolchain) -> LmResult<Self> {
		config.validate()?;
		let model_path = model_path.into();
		Ok(match kind {
			ModelKind::Primary => Self::Primary(KenLm::new(model_path, config.order, config.prune, toolchain)),
			ModelKind::Adaptive => Self::Adaptive(IrstLm::new(model_path, config.order, toolchain)),
			ModelKind::Multiplexed => Self::Multiplexed(MultiplexedLm::new(model_path, config, toolchain)),
		})
	}

	/// Same as `instantiate`, with the kind given by name.
	///
	/// # Errors
	/// Returns `UnknownVariant` for an unknown kind name.
	pub fn from_kind_name<P: Into<PathBuf>>(kind: &str, model_path: P, config: &LmConfig, toolchain: Toolchain) -> LmResult<Self> {
		Self::instantiate(kind.parse()?, model_path, config, toolchain)
	}

	pub fn kind(&self) -> ModelKind {
		match self {
			Self::Primary(_) => ModelKind::Primary,
			Self::Adaptive(_) => ModelKind::Adaptive,
			Self::Multiplexed(_) => ModelKind::Multiplexed,
		}
	}

	pub fn order(&self) -> u32 {
		match self {
			Self::Primary(lm) => lm.order(),
			Self::Adaptive(lm) => lm.order(),
			Self::Multiplexed(lm) => lm.order(),
		}
	}

	pub fn model_path(&self) -> &Path {
		match self {
			Self::Primary(lm) => lm.model_path(),
			Self::Adaptive(lm) => lm.model_path(),
			Self::Multiplexed(lm) => lm.model_path(),
		}
	}

	/// Decoder feature implementing this model.
	pub fn feature_name(&self) -> &'static str {
		match self {
			Self::Primary(_) => "KENLM",
			Self::Adaptive(_) => "IRSTLM",
			Self::Multiplexed(_) => "MUXLM",
		}
	}

	/// Trains the model. See `Trainer::train`.
	pub fn train<C: Corpus>(&self, corpora: &[C], lang: &str, working_dir: &Path, log: LogSink) -> LmResult<()> {
		match self {
			Self::Primary(lm) => lm.train(corpora, lang, working_dir, log),
			Self::Adaptive(lm) => lm.train(corpora, lang, working_dir, log),
			Self::Multiplexed(lm) => lm.train(corpora, lang, working_dir, log),
		}
	}

	/// One-line decoder configuration fragment.
	///
	/// The model path is rendered relative to `base` when it lives under it.
	pub fn iniline<B: AsRef<Path>>(&self, base: B) -> String {
		let path = relative_to(self.model_path(), base);
		match self {
			Self::Primary(lm) => lm.iniline(&path),
			Self::Adaptive(lm) => lm.iniline(&path),
			Self::Multiplexed(lm) => lm.iniline(&path),
		}
	}
}
