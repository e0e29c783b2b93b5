use std::ffi::{OsStr, OsString};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;

use crate::config::ToolPaths;
use crate::error::{LmError, LmResult};

/// Where engine diagnostics of a training job are written.
///
/// # Variants
/// - `Discard`: output is dropped.
/// - `Path(PathBuf)`: the file is created (truncated) when the job starts and
///   closed when it ends, whatever the outcome.
/// - `Stream(File)`: an already open file. The job closes its own handle only;
///   pass a `try_clone()` to keep using the file afterwards.
#[derive(Debug, Default)]
pub enum LogSink {
	#[default]
	Discard,
	Path(PathBuf),
	Stream(File),
}

impl LogSink {
	/// Acquires the sink for the duration of one job.
	///
	/// # Errors
	/// Returns an error if the log file cannot be created.
	pub fn open(self) -> io::Result<LogHandle> {
		match self {
			Self::Discard => Ok(LogHandle::discard()),
			Self::Path(path) => Ok(LogHandle { file: Some(File::create(path)?) }),
			Self::Stream(file) => Ok(LogHandle { file: Some(file) }),
		}
	}
}

impl From<PathBuf> for LogSink {
	fn from(path: PathBuf) -> Self {
		Self::Path(path)
	}
}

impl From<File> for LogSink {
	fn from(file: File) -> Self {
		Self::Stream(file)
	}
}

/// An acquired log sink. Dropping it closes the underlying file.
#[derive(Debug)]
pub struct LogHandle {
	file: Option<File>,
}

impl LogHandle {
	pub(crate) fn discard() -> Self {
		Self { file: None }
	}

	/// A redirection target for a child process.
	pub fn stdio(&self) -> io::Result<Stdio> {
		match &self.file {
			Some(file) => Ok(Stdio::from(file.try_clone()?)),
			None => Ok(Stdio::null()),
		}
	}

	/// A sink sharing this handle's destination, for nested jobs.
	pub fn share(&self) -> io::Result<LogSink> {
		match &self.file {
			Some(file) => Ok(LogSink::Stream(file.try_clone()?)),
			None => Ok(LogSink::Discard),
		}
	}
}

/// One blocking invocation of an external engine.
///
/// - `stdin`: optional file fed to the process
/// - `stdout`: optional file receiving the output; otherwise it goes to the log
/// - stderr always goes to the log
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineCommand {
	program: PathBuf,
	args: Vec<OsString>,
	stdin: Option<PathBuf>,
	stdout: Option<PathBuf>,
}

impl EngineCommand {
	pub fn new<P: Into<PathBuf>>(program: P) -> Self {
		Self { program: program.into(), args: Vec::new(), stdin: None, stdout: None }
	}

	pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
		self.args.push(arg.as_ref().to_owned());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		self.args.extend(args.into_iter().map(|a| a.as_ref().to_owned()));
		self
	}

	pub fn stdin_from<P: Into<PathBuf>>(mut self, path: P) -> Self {
		self.stdin = Some(path.into());
		self
	}

	pub fn stdout_to<P: Into<PathBuf>>(mut self, path: P) -> Self {
		self.stdout = Some(path.into());
		self
	}

	pub fn program(&self) -> &Path {
		&self.program
	}

	pub fn get_args(&self) -> &[OsString] {
		&self.args
	}

	pub fn stdin(&self) -> Option<&Path> {
		self.stdin.as_deref()
	}

	pub fn stdout(&self) -> Option<&Path> {
		self.stdout.as_deref()
	}

	/// Whether `arg` appears in the argument list.
	pub fn has_arg(&self, arg: &str) -> bool {
		self.args.iter().any(|a| a == arg)
	}
}

impl fmt::Display for EngineCommand {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.program.display())?;
		for arg in &self.args {
			write!(f, " {}", arg.to_string_lossy())?;
		}
		if let Some(stdin) = &self.stdin {
			write!(f, " < {}", stdin.display())?;
		}
		if let Some(stdout) = &self.stdout {
			write!(f, " > {}", stdout.display())?;
		}
		Ok(())
	}
}

/// Runs external engines.
///
/// Implementations block until the process exits and fail on a non-zero status.
pub trait CommandRunner: Send + Sync {
	fn run(&self, command: &EngineCommand, log: &LogHandle) -> LmResult<()>;
}

/// Runs engines as child processes of the current process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
	fn run(&self, command: &EngineCommand, log: &LogHandle) -> LmResult<()> {
		let stdin = match command.stdin() {
			Some(path) => Stdio::from(File::open(path)?),
			None => Stdio::null(),
		};
		let stdout = match command.stdout() {
			Some(path) => Stdio::from(File::create(path)?),
			None => log.stdio()?,
		};

		let status = Command::new(command.program())
			.args(command.get_args())
			.stdin(stdin)
			.stdout(stdout)
			.stderr(log.stdio()?)
			.status()
			.map_err(|source| LmError::Spawn { program: command.program().to_path_buf(), source })?;

		if !status.success() {
			return Err(LmError::ExternalProcess {
				program: command.program().to_path_buf(),
				status: status.to_string(),
			});
		}
		Ok(())
	}
}

/// Engine executables plus the runner that invokes them.
///
/// Cheap to clone: the runner is shared.
#[derive(Clone)]
pub struct Toolchain {
	pub paths: ToolPaths,
	runner: Arc<dyn CommandRunner>,
}

impl Toolchain {
	/// A toolchain running real child processes.
	pub fn new(paths: ToolPaths) -> Self {
		Self::with_runner(paths, Arc::new(ShellRunner))
	}

	pub fn with_runner(paths: ToolPaths, runner: Arc<dyn CommandRunner>) -> Self {
		Self { paths, runner }
	}

	/// Runs `command`, logging its command line first.
	pub fn run(&self, command: &EngineCommand, log: &LogHandle) -> LmResult<()> {
		log::debug!("running {command}");
		self.runner.run(command, log)
	}
}

impl fmt::Debug for Toolchain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Toolchain").field("paths", &self.paths).finish_non_exhaustive()
	}
}
