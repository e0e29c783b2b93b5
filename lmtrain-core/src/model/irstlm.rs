use std::path::{Path, PathBuf};

use super::training::{Stage, Trainer, TrainingJob};
use crate::corpus::Corpus;
use crate::error::LmResult;
use crate::shell::{EngineCommand, Toolchain};

/// Smoothing method passed to the adaptive counting engine.
const SMOOTHING: &str = "witten-bell";

/// Dictionary upper bound advertised to the decoder.
const DICTIONARY_UPPER_BOUND: u64 = 10_000_000;

/// Model trained with the adaptive-smoothing engine.
///
/// # Pipeline
/// 1. Merge the corpora into one text file
/// 2. Wrap every sentence in boundary markers
/// 3. Count n-grams with one worker per logical CPU, singleton pruning always on
/// 4. Compile the compressed ARPA output into the model path
///
/// The engine sizes its own memory, so there is no budget step.
#[derive(Clone, Debug)]
pub struct IrstLm {
	model_path: PathBuf,
	order: u32,
	toolchain: Toolchain,
}

impl IrstLm {
	pub(crate) fn new<P: Into<PathBuf>>(model_path: P, order: u32, toolchain: Toolchain) -> Self {
		Self { model_path: model_path.into(), order, toolchain }
	}

	pub fn order(&self) -> u32 {
		self.order
	}

	pub fn boundary_command(&self, merged_corpus: &Path, output: &Path) -> EngineCommand {
		EngineCommand::new(&self.toolchain.paths.add_start_end)
			.stdin_from(merged_corpus)
			.stdout_to(output)
	}

	/// Counting command. The engine appends `.gz` to `arpa_file`.
	pub fn count_command(&self, input: &Path, arpa_file: &Path, working_dir: &Path, workers: usize) -> EngineCommand {
		EngineCommand::new(&self.toolchain.paths.build_lm)
			.arg("-i")
			.arg(input)
			.args(["-k".to_owned(), workers.to_string()])
			.arg("-o")
			.arg(arpa_file)
			.args(["-n".to_owned(), self.order.to_string()])
			.args(["-s", SMOOTHING])
			.arg("-t")
			.arg(working_dir.join("temp"))
			.args(["-l", "/dev/stdout"])
			.arg("-irstlm")
			.arg(&self.toolchain.paths.irstlm_dir)
			.arg("--PruneSingletons")
	}

	pub fn compile_command(&self, arpa_file: &Path) -> EngineCommand {
		let mut compressed = arpa_file.as_os_str().to_owned();
		compressed.push(".gz");
		EngineCommand::new(&self.toolchain.paths.compile_lm)
			.arg(compressed)
			.arg(&self.model_path)
	}

	/// Decoder fragment: `factor=0 order=<order> path=<path> dub=<bound>`.
	pub fn iniline(&self, path: &Path) -> String {
		format!("factor=0 order={} path={} dub={}", self.order, path.display(), DICTIONARY_UPPER_BOUND)
	}
}

impl Trainer for IrstLm {
	fn model_path(&self) -> &Path {
		&self.model_path
	}

	fn execute<C: Corpus>(&self, job: &TrainingJob<'_, C>) -> LmResult<()> {
		let merged_corpus = job.merge_corpora()?;
		let bounded = job.working_dir.join("static_input.se");
		self.toolchain.run(&self.boundary_command(&merged_corpus, &bounded), &job.log)?;

		// build-lm always drops singletons
		job.enter_counting(true);
		let arpa_file = job.working_dir.join("static_lm.arpa");
		let workers = num_cpus::get();
		self.toolchain.run(&self.count_command(&bounded, &arpa_file, job.working_dir, workers), &job.log)?;

		job.enter(Stage::Binarizing);
		self.toolchain.run(&self.compile_command(&arpa_file), &job.log)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::config::ToolPaths;
	use crate::corpus::FileCorpus;
	use crate::model::training::testing::{executed_stages, noop_toolchain};

	fn model() -> IrstLm {
		IrstLm::new("/models/lm.irstlm", 4, Toolchain::new(ToolPaths::from_bin_dir("/opt/bin")))
	}

	#[test]
	fn count_command_layout() {
		let command = model().count_command(Path::new("/w/static_input.se"), Path::new("/w/static_lm.arpa"), Path::new("/w"), 8);
		assert_eq!(
			command.to_string(),
			"/opt/bin/irstlm-adaptivelm-v0.6/scripts/build-lm.sh -i /w/static_input.se -k 8 -o /w/static_lm.arpa -n 4 \
			 -s witten-bell -t /w/temp -l /dev/stdout -irstlm /opt/bin/irstlm-adaptivelm-v0.6 --PruneSingletons"
		);
	}

	#[test]
	fn compile_reads_compressed_arpa() {
		let command = model().compile_command(Path::new("/w/static_lm.arpa"));
		assert_eq!(command.to_string(), "/opt/bin/irstlm-adaptivelm-v0.6/bin/compile-lm /w/static_lm.arpa.gz /models/lm.irstlm");
	}

	#[test]
	fn boundary_pass_redirects_streams() {
		let command = model().boundary_command(Path::new("/w/merge"), Path::new("/w/static_input.se"));
		assert_eq!(command.stdin(), Some(Path::new("/w/merge")));
		assert_eq!(command.stdout(), Some(Path::new("/w/static_input.se")));
		assert!(command.get_args().is_empty());
	}

	#[test]
	fn stages_count_with_pruning_then_compile() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(dir.path().join("news.en"), "one\n").unwrap();
		let corpora = [FileCorpus::new("news", dir.path(), ["en"])];
		let lm = IrstLm::new(dir.path().join("lm.irstlm"), 4, noop_toolchain());

		assert_eq!(
			executed_stages(&lm, &corpora, &dir.path().join("work")),
			[Stage::Merging, Stage::Counting, Stage::Pruning, Stage::Binarizing]
		);
	}
}
