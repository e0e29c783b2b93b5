use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::slice;

use super::kenlm::KenLm;
use super::training::{Stage, Trainer, TrainingJob};
use crate::config::{InterpolationFunction, LmConfig};
use crate::corpus::Corpus;
use crate::error::LmResult;
use crate::io::parent_dir;
use crate::shell::Toolchain;

/// Descriptor name of the background sub-model.
pub const BACKGROUND_NAME: &str = "__background_lm__";

/// File name of the background sub-model, next to the descriptor.
const BACKGROUND_FILE: &str = "background.slm";

/// Extension of domain sub-models.
const DOMAIN_EXTENSION: &str = "alm";

/// One entry of the multiplexed descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubModel {
	pub name: String,
	/// Path relative to the descriptor's directory.
	pub relative_path: PathBuf,
	pub order: u32,
}

impl SubModel {
	fn line(&self) -> String {
		format!("KENLM name={} factor=0 order={} path={}", self.name, self.order, self.relative_path.display())
	}
}

/// Composite model blending a background LM with one LM per multilingual corpus.
///
/// The model path holds a line-oriented descriptor; the sub-models are
/// written next to it:
/// ```text
/// [verbose]
/// 0
/// [muxlm]
/// KENLM name=__background_lm__ factor=0 order=5 path=background.slm
/// KENLM name=europarl factor=0 order=5 path=europarl.alm
/// ```
///
/// # Notes
/// - Sub-models are trained sequentially: they share the working directory
///   and one engine run already saturates the CPUs.
/// - The descriptor is written last, so a failed sub-model leaves none behind.
#[derive(Clone, Debug)]
pub struct MultiplexedLm {
	model_path: PathBuf,
	order: u32,
	alpha: f64,
	function: InterpolationFunction,
	prune_background: bool,
	prune_domain: bool,
	toolchain: Toolchain,
}

impl MultiplexedLm {
	/// Builds the composite model. `config` is expected to be validated.
	pub(crate) fn new<P: Into<PathBuf>>(model_path: P, config: &LmConfig, toolchain: Toolchain) -> Self {
		Self {
			model_path: model_path.into(),
			order: config.order,
			alpha: config.alpha,
			function: config.function,
			prune_background: config.prune,
			prune_domain: config.prune_domain,
			toolchain,
		}
	}

	pub fn order(&self) -> u32 {
		self.order
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn function(&self) -> InterpolationFunction {
		self.function
	}

	pub fn background_name(&self) -> &'static str {
		BACKGROUND_NAME
	}

	fn model_dir(&self) -> PathBuf {
		parent_dir(&self.model_path)
	}

	fn background_entry(&self) -> SubModel {
		SubModel {
			name: BACKGROUND_NAME.to_owned(),
			relative_path: PathBuf::from(BACKGROUND_FILE),
			order: self.order,
		}
	}

	fn domain_entry<C: Corpus>(&self, corpus: &C) -> SubModel {
		SubModel {
			name: corpus.name().to_owned(),
			relative_path: PathBuf::from(format!("{}.{}", corpus.name(), DOMAIN_EXTENSION)),
			order: self.order,
		}
	}

	/// Sub-models trained for `corpora`: the background first, then one per
	/// multilingual corpus in input order.
	pub fn sub_models<C: Corpus>(&self, corpora: &[C]) -> Vec<SubModel> {
		let domains = corpora.iter().filter(|c| c.is_multilingual()).map(|c| self.domain_entry(c));
		std::iter::once(self.background_entry()).chain(domains).collect()
	}

	/// Descriptor content listing `sub_models`.
	pub fn descriptor(sub_models: &[SubModel]) -> String {
		let mut content = String::from("[verbose]\n0\n[muxlm]\n");
		for sub_model in sub_models {
			let _ = writeln!(content, "{}", sub_model.line());
		}
		content
	}

	fn sub_model(&self, sub_model: &SubModel, prune: bool) -> KenLm {
		KenLm::new(self.model_dir().join(&sub_model.relative_path), self.order, prune, self.toolchain.clone())
	}

	/// Decoder fragment: `factor=0 path=<path> background-lm=<name> alpha=<alpha> function=<function>`.
	pub fn iniline(&self, path: &Path) -> String {
		format!(
			"factor=0 path={} background-lm={} alpha={} function={}",
			path.display(),
			BACKGROUND_NAME,
			self.alpha,
			self.function.decoder_name()
		)
	}
}

impl Trainer for MultiplexedLm {
	fn model_path(&self) -> &Path {
		&self.model_path
	}

	fn execute<C: Corpus>(&self, job: &TrainingJob<'_, C>) -> LmResult<()> {
		let background = self.background_entry();
		job.enter(Stage::Counting);
		self.sub_model(&background, self.prune_background).train(
			job.corpora,
			job.lang,
			&job.working_dir.join(&background.relative_path),
			job.log.share()?,
		)?;

		let mut sub_models = vec![background];
		for corpus in job.corpora.iter().filter(|c| c.is_multilingual()) {
			let domain = self.domain_entry(corpus);
			job.enter(Stage::Counting);
			self.sub_model(&domain, self.prune_domain).train(
				slice::from_ref(corpus),
				job.lang,
				&job.working_dir.join(&domain.relative_path),
				job.log.share()?,
			)?;
			sub_models.push(domain);
		}

		job.enter(Stage::WritingDescriptor);
		fs::write(&self.model_path, Self::descriptor(&sub_models))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ToolPaths;
	use crate::corpus::FileCorpus;
	use crate::model::training::testing::{executed_stages, noop_toolchain};

	fn model(config: &LmConfig) -> MultiplexedLm {
		MultiplexedLm::new("/engine/models/lm/lm.mlm", config, Toolchain::new(ToolPaths::from_bin_dir("/opt/bin")))
	}

	fn corpora() -> Vec<FileCorpus> {
		vec![
			FileCorpus::new("mono_a", "/data", ["en"]),
			FileCorpus::new("bi_b", "/data", ["en", "it"]),
			FileCorpus::new("bi_c", "/data", ["en", "it"]),
		]
	}

	#[test]
	fn descriptor_lists_background_then_domains() {
		let lm = model(&LmConfig::default());
		let descriptor = MultiplexedLm::descriptor(&lm.sub_models(&corpora()));

		assert_eq!(
			descriptor,
			"[verbose]\n0\n[muxlm]\n\
			 KENLM name=__background_lm__ factor=0 order=5 path=background.slm\n\
			 KENLM name=bi_b factor=0 order=5 path=bi_b.alm\n\
			 KENLM name=bi_c factor=0 order=5 path=bi_c.alm\n"
		);
	}

	#[test]
	fn monolingual_corpora_only_feed_background() {
		let lm = model(&LmConfig::default());
		let sub_models = lm.sub_models(&[FileCorpus::new("mono_a", "/data", ["en"])]);
		assert_eq!(sub_models.len(), 1);
		assert_eq!(sub_models[0].name, BACKGROUND_NAME);
	}

	#[test]
	fn sub_models_inherit_order_and_pruning() {
		let config = LmConfig { order: 3, prune_domain: true, ..LmConfig::default() };
		let lm = model(&config);
		let sub_models = lm.sub_models(&corpora());

		let domain = lm.sub_model(&sub_models[1], lm.prune_domain);
		assert_eq!(domain.order(), 3);
		assert!(domain.prune());
		assert_eq!(domain.model_path(), Path::new("/engine/models/lm/bi_b.alm"));
	}

	#[test]
	fn iniline_carries_blend_parameters() {
		let config = LmConfig { alpha: 0.25, function: InterpolationFunction::Max, ..LmConfig::default() };
		assert_eq!(
			model(&config).iniline(Path::new("models/lm/lm.mlm")),
			"factor=0 path=models/lm/lm.mlm background-lm=__background_lm__ alpha=0.25 function=interpolate-max"
		);
	}

	#[test]
	fn every_sub_model_is_counted_before_the_descriptor() {
		let dir = tempfile::tempdir().unwrap();
		for (file, text) in [("mono_a.en", "one\n"), ("bi_b.en", "two\n"), ("bi_b.it", "due\n")] {
			fs::write(dir.path().join(file), text).unwrap();
		}
		let corpora = [FileCorpus::new("mono_a", dir.path(), ["en"]), FileCorpus::new("bi_b", dir.path(), ["en", "it"])];
		let lm = MultiplexedLm::new(dir.path().join("models/lm.mlm"), &LmConfig::default(), noop_toolchain());

		assert_eq!(
			executed_stages(&lm, &corpora, &dir.path().join("work")),
			[Stage::Counting, Stage::Counting, Stage::WritingDescriptor]
		);
		assert!(lm.model_path().is_file());
	}
}
