use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{LmError, LmResult};

/// Environment variable holding the engines' install directory.
pub const BIN_DIR_ENV: &str = "LMTRAIN_BIN_DIR";

const DEFAULT_BIN_DIR: &str = "bin";
const KENLM_DIR: &str = "kenlm-stable";
const IRSTLM_DIR: &str = "irstlm-adaptivelm-v0.6";

/// Rule used by the decoder to blend background and domain scores.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InterpolationFunction {
	#[default]
	#[serde(alias = "interpolate-linear")]
	Linear,
	#[serde(alias = "interpolate-log-linear")]
	LogLinear,
	#[serde(alias = "interpolate-max")]
	Max,
}

impl InterpolationFunction {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Linear => "linear",
			Self::LogLinear => "log-linear",
			Self::Max => "max",
		}
	}

	/// Spelling the decoder expects in a `function=` parameter.
	pub fn decoder_name(&self) -> &'static str {
		match self {
			Self::Linear => "interpolate-linear",
			Self::LogLinear => "interpolate-log-linear",
			Self::Max => "interpolate-max",
		}
	}
}

impl fmt::Display for InterpolationFunction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for InterpolationFunction {
	type Err = LmError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.strip_prefix("interpolate-").unwrap_or(s) {
			"linear" => Ok(Self::Linear),
			"log-linear" => Ok(Self::LogLinear),
			"max" => Ok(Self::Max),
			_ => Err(LmError::ConfigValidation(format!(
				"interpolation function must be one of linear, log-linear, max, got {s}"
			))),
		}
	}
}

/// Language model parameters (`[lm]` section).
///
/// Every field has a default, so an empty section yields a valid config.
///
/// # Invariants (checked by `validate`)
/// - `order >= 1`
/// - `0.0 <= alpha < 1.0`
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LmConfig {
	/// N-gram order (maximum n-gram length).
	pub order: u32,

	/// Weight fraction given to the domain models, the rest goes to the background model.
	pub alpha: f64,

	/// Decode-time interpolation rule for multiplexed models.
	pub function: InterpolationFunction,

	/// Singleton pruning for primary models (only applies when `order > 2`).
	pub prune: bool,

	/// Singleton pruning for the domain sub-models of a multiplexed model.
	pub prune_domain: bool,
}

impl Default for LmConfig {
	fn default() -> Self {
		Self {
			order: 5,
			alpha: 0.5,
			function: InterpolationFunction::Linear,
			prune: true,
			prune_domain: false,
		}
	}
}

impl LmConfig {
	/// Checks the value ranges.
	///
	/// # Errors
	/// Returns `ConfigValidation` for a zero order or an alpha outside `[0, 1)`.
	pub fn validate(&self) -> LmResult<()> {
		if self.order < 1 {
			return Err(LmError::ConfigValidation("order must be >= 1".to_owned()));
		}
		if !(0.0..1.0).contains(&self.alpha) {
			return Err(LmError::ConfigValidation(format!("alpha must be in [0, 1), got {}", self.alpha)));
		}
		Ok(())
	}
}

/// Engine executables (`[tools]` section).
///
/// Every entry is optional: missing ones are derived from `bin_dir` using
/// the conventional install layout.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
	pub bin_dir: Option<PathBuf>,
	pub lmplz: Option<PathBuf>,
	pub build_binary: Option<PathBuf>,
	pub irstlm_dir: Option<PathBuf>,
	pub add_start_end: Option<PathBuf>,
	pub build_lm: Option<PathBuf>,
	pub compile_lm: Option<PathBuf>,
}

impl ToolsConfig {
	/// Resolves every executable path.
	///
	/// `bin_dir` falls back to `$LMTRAIN_BIN_DIR`, then to `./bin`.
	pub fn resolve(&self) -> ToolPaths {
		let bin_dir = self
			.bin_dir
			.clone()
			.or_else(|| env::var_os(BIN_DIR_ENV).map(PathBuf::from))
			.unwrap_or_else(|| PathBuf::from(DEFAULT_BIN_DIR));
		let defaults = ToolPaths::from_bin_dir(bin_dir);

		let irstlm_dir = self.irstlm_dir.clone().unwrap_or(defaults.irstlm_dir);
		let irstlm = ToolPaths::from_irstlm_dir(&irstlm_dir);

		ToolPaths {
			lmplz: self.lmplz.clone().unwrap_or(defaults.lmplz),
			build_binary: self.build_binary.clone().unwrap_or(defaults.build_binary),
			add_start_end: self.add_start_end.clone().unwrap_or(irstlm.add_start_end),
			build_lm: self.build_lm.clone().unwrap_or(irstlm.build_lm),
			compile_lm: self.compile_lm.clone().unwrap_or(irstlm.compile_lm),
			irstlm_dir,
		}
	}
}

/// Resolved engine executables, passed explicitly to every backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolPaths {
	/// Primary counting engine.
	pub lmplz: PathBuf,
	/// Primary binarizer.
	pub build_binary: PathBuf,
	/// Adaptive engine install root (handed to its build script).
	pub irstlm_dir: PathBuf,
	/// Sentence boundary marker pass.
	pub add_start_end: PathBuf,
	/// Adaptive counting engine.
	pub build_lm: PathBuf,
	/// Adaptive compiler.
	pub compile_lm: PathBuf,
}

impl ToolPaths {
	/// Builds the conventional layout under `bin_dir`.
	pub fn from_bin_dir<P: AsRef<Path>>(bin_dir: P) -> Self {
		let bin_dir = bin_dir.as_ref();
		let kenlm_bin = bin_dir.join(KENLM_DIR).join("bin");
		let mut paths = Self::from_irstlm_dir(bin_dir.join(IRSTLM_DIR));
		paths.lmplz = kenlm_bin.join("lmplz");
		paths.build_binary = kenlm_bin.join("build_binary");
		paths
	}

	fn from_irstlm_dir<P: AsRef<Path>>(irstlm_dir: P) -> Self {
		let irstlm_dir = irstlm_dir.as_ref();
		Self {
			lmplz: PathBuf::from("lmplz"),
			build_binary: PathBuf::from("build_binary"),
			add_start_end: irstlm_dir.join("scripts").join("add-start-end.sh"),
			build_lm: irstlm_dir.join("scripts").join("build-lm.sh"),
			compile_lm: irstlm_dir.join("bin").join("compile-lm"),
			irstlm_dir: irstlm_dir.to_path_buf(),
		}
	}
}

/// Settings file content: `[lm]` and `[tools]`, both optional.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
	pub lm: LmConfig,
	pub tools: ToolsConfig,
}

impl Settings {
	/// Parses and validates a TOML settings document.
	///
	/// # Errors
	/// Returns `ConfigParse` for malformed TOML or unknown keys, and
	/// `ConfigValidation` for out-of-range values.
	pub fn parse(content: &str) -> LmResult<Self> {
		let settings: Self = toml::from_str(content)?;
		settings.lm.validate()?;
		Ok(settings)
	}

	/// Loads a settings file from disk.
	pub fn load<P: AsRef<Path>>(path: P) -> LmResult<Self> {
		Self::parse(&fs::read_to_string(path)?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = LmConfig::default();
		assert_eq!(config.order, 5);
		assert_eq!(config.alpha, 0.5);
		assert_eq!(config.function, InterpolationFunction::Linear);
		assert!(config.prune);
		assert!(!config.prune_domain);
		assert!(config.validate().is_ok());
	}

	#[test]
	fn alpha_bounds() {
		for alpha in [-0.1, 1.0] {
			let config = LmConfig { alpha, ..LmConfig::default() };
			assert!(matches!(config.validate(), Err(LmError::ConfigValidation(_))), "alpha {alpha}");
		}
		for alpha in [0.0, 0.999] {
			let config = LmConfig { alpha, ..LmConfig::default() };
			assert!(config.validate().is_ok(), "alpha {alpha}");
		}
	}

	#[test]
	fn zero_order_is_rejected() {
		let config = LmConfig { order: 0, ..LmConfig::default() };
		assert!(matches!(config.validate(), Err(LmError::ConfigValidation(_))));
	}

	#[test]
	fn function_accepts_decoder_spelling() {
		assert_eq!("interpolate-max".parse::<InterpolationFunction>().unwrap(), InterpolationFunction::Max);
		assert_eq!("log-linear".parse::<InterpolationFunction>().unwrap(), InterpolationFunction::LogLinear);
		assert!("geometric".parse::<InterpolationFunction>().is_err());
	}

	#[test]
	fn function_renders_decoder_spelling() {
		assert_eq!(InterpolationFunction::Linear.decoder_name(), "interpolate-linear");
		assert_eq!(InterpolationFunction::LogLinear.decoder_name(), "interpolate-log-linear");
		assert_eq!("max".parse::<InterpolationFunction>().unwrap().decoder_name(), "interpolate-max");
	}

	#[test]
	fn settings_parse_partial_sections() {
		let settings = Settings::parse(
			r#"
			[lm]
			order = 3
			function = "interpolate-log-linear"

			[tools]
			bin_dir = "/opt/engines"
			"#,
		)
		.unwrap();

		assert_eq!(settings.lm.order, 3);
		assert_eq!(settings.lm.alpha, 0.5);
		assert_eq!(settings.lm.function, InterpolationFunction::LogLinear);

		let paths = settings.tools.resolve();
		assert_eq!(paths.lmplz, PathBuf::from("/opt/engines/kenlm-stable/bin/lmplz"));
		assert_eq!(paths.compile_lm, PathBuf::from("/opt/engines/irstlm-adaptivelm-v0.6/bin/compile-lm"));
	}

	#[test]
	fn settings_reject_out_of_range_values() {
		assert!(matches!(Settings::parse("[lm]\nalpha = 1.0\n"), Err(LmError::ConfigValidation(_))));
		assert!(matches!(Settings::parse("[lm]\nfunction = \"geometric\"\n"), Err(LmError::ConfigParse(_))));
	}

	#[test]
	fn tool_overrides_win_over_layout() {
		let tools = ToolsConfig {
			bin_dir: Some(PathBuf::from("/opt/engines")),
			lmplz: Some(PathBuf::from("/usr/local/bin/lmplz")),
			irstlm_dir: Some(PathBuf::from("/srv/irstlm")),
			..ToolsConfig::default()
		};

		let paths = tools.resolve();
		assert_eq!(paths.lmplz, PathBuf::from("/usr/local/bin/lmplz"));
		assert_eq!(paths.build_binary, PathBuf::from("/opt/engines/kenlm-stable/bin/build_binary"));
		assert_eq!(paths.build_lm, PathBuf::from("/srv/irstlm/scripts/build-lm.sh"));
	}
}
