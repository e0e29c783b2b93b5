use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::corpus::Corpus;
use crate::error::{LmError, LmResult};
use crate::io::{make_dirs, merge, parent_dir};
use crate::shell::{LogHandle, LogSink};

/// Name of the merged corpus inside a working directory.
const MERGED_CORPUS: &str = "merge";

/// Progress of a training job.
///
/// Jobs move forward only; any error ends in `Failed` and there is no resume.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
	NotStarted,
	Validating,
	PreparingDirs,
	Merging,
	Counting,
	Pruning,
	Binarizing,
	WritingDescriptor,
	Done,
	Failed,
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::NotStarted => "not started",
			Self::Validating => "validating",
			Self::PreparingDirs => "preparing directories",
			Self::Merging => "merging corpora",
			Self::Counting => "counting",
			Self::Pruning => "counting with pruning",
			Self::Binarizing => "binarizing",
			Self::WritingDescriptor => "writing descriptor",
			Self::Done => "done",
			Self::Failed => "failed",
		};
		f.write_str(name)
	}
}

/// Working context of one `train` call.
///
/// Lives only for the duration of the call; the log handle is released when
/// the job is dropped.
pub struct TrainingJob<'a, C> {
	pub corpora: &'a [C],
	pub lang: &'a str,
	pub working_dir: &'a Path,
	pub log: LogHandle,
	model_path: &'a Path,
	stages: RefCell<Vec<Stage>>,
}

impl<'a, C: Corpus> TrainingJob<'a, C> {
	pub(crate) fn new(corpora: &'a [C], lang: &'a str, working_dir: &'a Path, model_path: &'a Path) -> Self {
		Self {
			corpora,
			lang,
			working_dir,
			log: LogHandle::discard(),
			model_path,
			stages: RefCell::new(Vec::new()),
		}
	}

	/// Records a stage transition.
	pub fn enter(&self, stage: Stage) {
		log::info!("{}: {}", self.model_path.display(), stage);
		self.stages.borrow_mut().push(stage);
	}

	/// Enters `Counting`, then `Pruning` when the count step also prunes.
	pub fn enter_counting(&self, pruning: bool) {
		self.enter(Stage::Counting);
		if pruning {
			self.enter(Stage::Pruning);
		}
	}

	pub fn stage(&self) -> Stage {
		self.stages.borrow().last().copied().unwrap_or(Stage::NotStarted)
	}

	/// Every stage entered so far, oldest first.
	pub fn history(&self) -> Vec<Stage> {
		self.stages.borrow().clone()
	}

	/// Concatenates the `lang` file of every corpus into the working directory.
	///
	/// Returns the merged corpus path.
	pub fn merge_corpora(&self) -> LmResult<PathBuf> {
		self.enter(Stage::Merging);
		let inputs: Vec<PathBuf> = self.corpora.iter().map(|c| c.file_path(self.lang)).collect();
		let merged = self.working_dir.join(MERGED_CORPUS);
		merge(&inputs, &merged)?;
		Ok(merged)
	}

	/// Validation and directory preparation, then acquisition of the log sink.
	fn prepare(&mut self, sink: LogSink) -> LmResult<()> {
		self.enter(Stage::Validating);
		if self.model_path.exists() {
			return Err(LmError::Precondition { path: self.model_path.to_path_buf() });
		}

		self.enter(Stage::PreparingDirs);
		make_dirs(parent_dir(self.model_path))?;
		make_dirs(self.working_dir)?;

		self.log = sink.open()?;
		Ok(())
	}

	fn fail(&self, error: &LmError) {
		log::error!("{}: training failed while {}: {error}", self.model_path.display(), self.stage());
		self.stages.borrow_mut().push(Stage::Failed);
	}
}

/// Shared training contract of every model variant.
///
/// `train` performs the common steps, then delegates to `execute`:
/// 1. Refuses to proceed if a model already exists at `model_path`
/// 2. Creates the model's parent directory and the working directory
/// 3. Acquires the log sink for the whole job
pub trait Trainer {
	/// Path of the artifact this model writes.
	fn model_path(&self) -> &Path;

	/// Variant-specific training steps.
	fn execute<C: Corpus>(&self, job: &TrainingJob<'_, C>) -> LmResult<()>;

	/// Trains the model on the `lang` side of `corpora`.
	///
	/// # Errors
	/// - `Precondition` if the model already exists (no engine is invoked)
	/// - `ExternalProcess` / `Spawn` if an engine fails
	/// - `Io` for filesystem failures
	///
	/// # Notes
	/// Partial artifacts of a failed run are left on disk for diagnosis.
	fn train<C: Corpus>(&self, corpora: &[C], lang: &str, working_dir: &Path, log: LogSink) -> LmResult<()> {
		let mut job = TrainingJob::new(corpora, lang, working_dir, self.model_path());
		let result = job.prepare(log).and_then(|()| self.execute(&job));
		match &result {
			Ok(()) => job.enter(Stage::Done),
			Err(e) => job.fail(e),
		}
		result
	}
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::corpus::FileCorpus;
	use std::cell::RefCell;
	use std::fs;

	/// Writes the merged corpus as its model.
	#[derive(Default)]
	struct CopyTrainer {
		model_path: PathBuf,
		stages: RefCell<Vec<Stage>>,
	}

	impl Trainer for CopyTrainer {
		fn model_path(&self) -> &Path {
			&self.model_path
		}

		fn execute<C: Corpus>(&self, job: &TrainingJob<'_, C>) -> LmResult<()> {
			self.stages.borrow_mut().push(job.stage());
			let merged = job.merge_corpora()?;
			fs::copy(merged, &self.model_path)?;
			Ok(())
		}
	}

	#[test]
	fn train_prepares_directories_before_executing() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("news.en"), "one\n").unwrap();
		let corpora = [FileCorpus::new("news", dir.path(), ["en"])];
		let trainer = CopyTrainer { model_path: dir.path().join("models/deep/lm.bin"), ..CopyTrainer::default() };

		trainer.train(&corpora, "en", &dir.path().join("work/lm"), LogSink::Discard).unwrap();

		assert_eq!(fs::read_to_string(&trainer.model_path).unwrap(), "one\n");
		assert!(dir.path().join("work/lm/merge").is_file());
		assert_eq!(*trainer.stages.borrow(), [Stage::PreparingDirs]);
	}

	#[test]
	fn existing_model_is_never_overwritten() {
		let dir = tempfile::tempdir().unwrap();
		let model_path = dir.path().join("lm.bin");
		fs::write(&model_path, "previous").unwrap();
		let trainer = CopyTrainer { model_path: model_path.clone(), ..CopyTrainer::default() };

		let corpora: [FileCorpus; 0] = [];
		let err = trainer.train(&corpora, "en", dir.path(), LogSink::Discard).unwrap_err();

		assert!(matches!(err, LmError::Precondition { .. }));
		assert!(trainer.stages.borrow().is_empty());
		assert_eq!(fs::read_to_string(model_path).unwrap(), "previous");
	}

	#[test]
	fn failure_is_recorded_after_the_failing_stage() {
		let dir = tempfile::tempdir().unwrap();
		let corpora = [FileCorpus::new("news", dir.path(), ["en"])];
		let trainer = CopyTrainer { model_path: dir.path().join("lm.bin"), ..CopyTrainer::default() };
		let mut job = TrainingJob::new(&corpora, "en", dir.path(), &trainer.model_path);

		job.prepare(LogSink::Discard).unwrap();
		job.enter_counting(true);
		job.fail(&LmError::ResourceComputation("test".to_owned()));

		assert_eq!(
			job.history(),
			[Stage::Validating, Stage::PreparingDirs, Stage::Counting, Stage::Pruning, Stage::Failed]
		);
		assert_eq!(job.stage(), Stage::Failed);
	}

	#[test]
	fn log_file_is_created_under_fresh_working_dir() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("news.en"), "one\n").unwrap();
		let corpora = [FileCorpus::new("news", dir.path(), ["en"])];
		let trainer = CopyTrainer { model_path: dir.path().join("lm.bin"), ..CopyTrainer::default() };
		let log_path = dir.path().join("work/train.log");

		trainer.train(&corpora, "en", &dir.path().join("work"), LogSink::Path(log_path.clone())).unwrap();

		assert!(log_path.is_file());
	}
}
