use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::list_files;

/// A named collection of per-language text files.
///
/// Corpora are owned by the caller; training only reads the file returned
/// by `file_path` for the target language.
pub trait Corpus {
	/// Corpus name, used to name domain sub-models.
	fn name(&self) -> &str;

	/// Language tags this corpus carries.
	fn languages(&self) -> &[String];

	/// Path of the text file for `lang`.
	fn file_path(&self, lang: &str) -> PathBuf;

	/// Whether the corpus carries more than one language.
	fn is_multilingual(&self) -> bool {
		self.languages().len() > 1
	}
}

impl<T: Corpus + ?Sized> Corpus for &T {
	fn name(&self) -> &str {
		(**self).name()
	}

	fn languages(&self) -> &[String] {
		(**self).languages()
	}

	fn file_path(&self, lang: &str) -> PathBuf {
		(**self).file_path(lang)
	}
}

/// A corpus stored as `<root>/<name>.<lang>` files.
///
/// # Invariants
/// - `languages` is sorted and free of duplicates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileCorpus {
	name: String,
	root: PathBuf,
	languages: Vec<String>,
}

impl FileCorpus {
	/// Creates a corpus rooted at `root`. Files are not checked for existence.
	pub fn new<S, P, L>(name: S, root: P, languages: L) -> Self
	where
		S: Into<String>,
		P: Into<PathBuf>,
		L: IntoIterator,
		L::Item: Into<String>,
	{
		let mut languages: Vec<String> = languages.into_iter().map(Into::into).collect();
		languages.sort();
		languages.dedup();
		Self { name: name.into(), root: root.into(), languages }
	}

	/// Discovers the corpora stored in `dir`.
	///
	/// Files are grouped by name (the part before the last `.`), and only
	/// extensions listed in `langs` are kept. Files without an extension
	/// and corpora with no requested language are skipped.
	///
	/// Example: `europarl.en`, `europarl.it`, `news.en` with langs `[en, it]`
	/// yields `europarl [en, it]` and `news [en]`, sorted by name.
	///
	/// # Errors
	/// Returns an error if the directory cannot be read.
	pub fn list<P: AsRef<Path>>(dir: P, langs: &[&str]) -> io::Result<Vec<Self>> {
		let dir = dir.as_ref();
		let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();

		for file in list_files(dir)? {
			let Some((name, lang)) = file.rsplit_once('.') else { continue };
			if name.is_empty() || !langs.contains(&lang) {
				continue;
			}
			grouped.entry(name.to_owned()).or_default().push(lang.to_owned());
		}

		Ok(grouped
			.into_iter()
			.map(|(name, languages)| Self::new(name, dir, languages))
			.collect())
	}
}

impl Corpus for FileCorpus {
	fn name(&self) -> &str {
		&self.name
	}

	fn languages(&self) -> &[String] {
		&self.languages
	}

	fn file_path(&self, lang: &str) -> PathBuf {
		self.root.join(format!("{}.{}", self.name, lang))
	}
}
