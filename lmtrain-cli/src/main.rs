use std::path::PathBuf;

use clap::Parser;

use lmtrain_core::config::Settings;
use lmtrain_core::corpus::{Corpus, FileCorpus};
use lmtrain_core::model::LanguageModel;
use lmtrain_core::shell::{LogSink, Toolchain};

/// Trains a language model over the corpora of a directory and prints its
/// decoder feature line.
#[derive(Parser, Debug)]
#[command(name = "lmtrain", version)]
struct Args {
	/// Model kind: primary, adaptive or multiplexed
	#[arg(short, long, default_value = "primary")]
	kind: String,

	/// Path of the model to write (must not exist)
	#[arg(short, long)]
	model: PathBuf,

	/// Directory holding `<name>.<lang>` corpus files
	#[arg(short, long)]
	corpora: PathBuf,

	/// Target language
	#[arg(short, long)]
	lang: String,

	/// Other languages of bilingual corpora (repeatable)
	#[arg(short = 's', long = "source-lang")]
	source_langs: Vec<String>,

	/// Scratch directory for the engines
	#[arg(short, long, default_value = "./lm-work")]
	working_dir: PathBuf,

	/// Settings file with `[lm]` and `[tools]` sections
	#[arg(long, env = "LMTRAIN_CONFIG")]
	config: Option<PathBuf>,

	/// Engine log file (engine output is discarded otherwise)
	#[arg(long)]
	log: Option<PathBuf>,

	/// Directory the printed model path is made relative to
	#[arg(long, default_value = ".")]
	engine_dir: PathBuf,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let settings = match &args.config {
		Some(path) => Settings::load(path)?,
		None => Settings::default(),
	};
	let toolchain = Toolchain::new(settings.tools.resolve());
	let lm = LanguageModel::from_kind_name(&args.kind, &args.model, &settings.lm, toolchain)?;

	// Languages looked up in the corpus directory: the target plus the sources
	let mut langs: Vec<&str> = vec![args.lang.as_str()];
	langs.extend(args.source_langs.iter().map(String::as_str));
	let corpora: Vec<FileCorpus> = FileCorpus::list(&args.corpora, &langs)?
		.into_iter()
		.filter(|c| c.languages().iter().any(|l| *l == args.lang))
		.collect();
	if corpora.is_empty() {
		return Err(format!("No '{}' corpus found in {}", args.lang, args.corpora.display()).into());
	}
	log::info!("training {} model over {} corpora", lm.kind(), corpora.len());

	let log = args.log.map(LogSink::Path).unwrap_or_default();
	lm.train(&corpora, &args.lang, &args.working_dir, log)?;

	println!("{} {}", lm.feature_name(), lm.iniline(&args.engine_dir));
	Ok(())
}
