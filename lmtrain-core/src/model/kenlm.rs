use std::path::{Path, PathBuf};

use super::training::{Stage, Trainer, TrainingJob};
use crate::corpus::Corpus;
use crate::error::LmResult;
use crate::memory::corpus_budget;
use crate::shell::{EngineCommand, Toolchain};

/// Singleton pruning thresholds per order: keep every unigram and bigram,
/// drop trigrams and above seen only once.
const PRUNE_THRESHOLDS: [&str; 3] = ["0", "0", "1"];

/// Model trained with the primary (fast) counting engine.
///
/// # Pipeline
/// 1. Merge the corpora into one text file
/// 2. Size the engine's memory budget from the merged size and live memory
/// 3. Count n-grams into an ARPA file, with singleton pruning when enabled and `order > 2`
/// 4. Binarize the ARPA file into the model path
///
/// # Invariants
/// - Configuration is fixed at construction
#[derive(Clone, Debug)]
pub struct KenLm {
	model_path: PathBuf,
	order: u32,
	prune: bool,
	toolchain: Toolchain,
}

impl KenLm {
	pub(crate) fn new<P: Into<PathBuf>>(model_path: P, order: u32, prune: bool, toolchain: Toolchain) -> Self {
		Self { model_path: model_path.into(), order, prune, toolchain }
	}

	pub fn order(&self) -> u32 {
		self.order
	}

	pub fn prune(&self) -> bool {
		self.prune
	}

	/// Whether the counting command carries the pruning flags.
	fn prunes(&self) -> bool {
		self.order > 2 && self.prune
	}

	/// Counting command reading `merged_corpus` and writing `arpa_file`.
	pub fn count_command(&self, merged_corpus: &Path, arpa_file: &Path, memory: &str, working_dir: &Path) -> EngineCommand {
		let command = EngineCommand::new(&self.toolchain.paths.lmplz)
			.arg("--discount_fallback")
			.args(["-o".to_owned(), self.order.to_string()])
			.args(["-S", memory])
			.arg("-T")
			.arg(working_dir)
			.stdin_from(merged_corpus)
			.stdout_to(arpa_file);

		if self.prunes() {
			command.arg("--prune").args(PRUNE_THRESHOLDS)
		} else {
			command
		}
	}

	pub fn binarize_command(&self, arpa_file: &Path) -> EngineCommand {
		EngineCommand::new(&self.toolchain.paths.build_binary)
			.arg(arpa_file)
			.arg(&self.model_path)
	}

	/// Decoder fragment: `factor=0 order=<order> path=<path>`.
	pub fn iniline(&self, path: &Path) -> String {
		format!("factor=0 order={} path={}", self.order, path.display())
	}
}

impl Trainer for KenLm {
	fn model_path(&self) -> &Path {
		&self.model_path
	}

	fn execute<C: Corpus>(&self, job: &TrainingJob<'_, C>) -> LmResult<()> {
		let merged_corpus = job.merge_corpora()?;
		let memory = corpus_budget(&merged_corpus)?;
		log::info!("{}: memory budget {memory}", self.model_path.display());

		job.enter_counting(self.prunes());
		let arpa_file = job.working_dir.join("lm.arpa");
		self.toolchain.run(&self.count_command(&merged_corpus, &arpa_file, &memory, job.working_dir), &job.log)?;

		job.enter(Stage::Binarizing);
		self.toolchain.run(&self.binarize_command(&arpa_file), &job.log)
	}
}
