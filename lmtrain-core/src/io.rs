use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Concatenates `inputs` into `output`, in order.
///
/// - `output` is created or truncated
/// - A newline is inserted after any input that does not end with one,
///   so the last line of a file never joins the first line of the next
pub(crate) fn merge<P: AsRef<Path>>(inputs: &[P], output: &Path) -> io::Result<()> {
	let mut writer = BufWriter::new(File::create(output)?);
	let mut buffer = [0u8; 64 * 1024];

	for input in inputs {
		let mut reader = BufReader::new(File::open(input)?);
		let mut last_byte = None;
		loop {
			let read = reader.read(&mut buffer)?;
			if read == 0 {
				break;
			}
			writer.write_all(&buffer[..read])?;
			last_byte = Some(buffer[read - 1]);
		}
		if matches!(last_byte, Some(b) if b != b'\n') {
			writer.write_all(b"\n")?;
		}
	}

	writer.flush()
}

/// Creates `dir` and all its parents. Succeeds if it already exists.
pub(crate) fn make_dirs<P: AsRef<Path>>(dir: P) -> io::Result<()> {
	fs::create_dir_all(dir)
}

/// Returns the directory containing `path`.
///
/// Examples:
/// - `"models/lm/lm.mlm"` → `"models/lm"`
/// - `"lm.mlm"` → `"."`
pub(crate) fn parent_dir<P: AsRef<Path>>(path: P) -> PathBuf {
	match path.as_ref().parent() {
		Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
		_ => PathBuf::from("."),
	}
}

/// Renders `path` relative to `base` when it lives under it, verbatim otherwise.
pub(crate) fn relative_to<P: AsRef<Path>, B: AsRef<Path>>(path: P, base: B) -> PathBuf {
	let path = path.as_ref();
	match path.strip_prefix(base.as_ref()) {
		Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
		_ => path.to_path_buf(),
	}
}

/// Lists all regular files in a directory.
///
/// Returns file names only (no paths), sorted.
pub(crate) fn list_files<P: AsRef<Path>>(dir: P) -> io::Result<Vec<String>> {
	let mut files = Vec::new();

	for entry in fs::read_dir(dir)? {
		let path = entry?.path();
		if path.is_file() {
			if let Some(name) = path.file_name() {
				files.push(name.to_string_lossy().to_string());
			}
		}
	}

	files.sort();
	Ok(files)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn merge_keeps_order_and_separates_lines() {
		let dir = tempfile::tempdir().unwrap();
		let a = dir.path().join("a.en");
		let b = dir.path().join("b.en");
		fs::write(&a, "first\nsecond").unwrap();
		fs::write(&b, "third\n").unwrap();

		let merged = dir.path().join("merge");
		merge(&[&a, &b], &merged).unwrap();

		assert_eq!(fs::read_to_string(merged).unwrap(), "first\nsecond\nthird\n");
	}

	#[test]
	fn merge_of_empty_file_adds_nothing() {
		let dir = tempfile::tempdir().unwrap();
		let empty = dir.path().join("empty.en");
		fs::write(&empty, "").unwrap();

		let merged = dir.path().join("merge");
		merge(&[&empty], &merged).unwrap();

		assert_eq!(fs::metadata(merged).unwrap().len(), 0);
	}

	#[test]
	fn parent_dir_of_bare_file_is_current_dir() {
		assert_eq!(parent_dir("lm.mlm"), PathBuf::from("."));
		assert_eq!(parent_dir("models/lm/lm.mlm"), PathBuf::from("models/lm"));
	}

	#[test]
	fn relative_to_strips_base_only_when_nested() {
		assert_eq!(relative_to("/engine/models/lm.kenlm", "/engine"), PathBuf::from("models/lm.kenlm"));
		assert_eq!(relative_to("/other/lm.kenlm", "/engine"), PathBuf::from("/other/lm.kenlm"));
	}

	#[test]
	fn list_files_skips_directories() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("b.it"), "").unwrap();
		fs::write(dir.path().join("a.en"), "").unwrap();
		fs::create_dir(dir.path().join("nested")).unwrap();

		assert_eq!(list_files(dir.path()).unwrap(), vec!["a.en".to_owned(), "b.it".to_owned()]);
	}
}
