use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{LmError, LmResult};

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Share of *available* memory the counting engine may claim.
const MAX_AVAILABLE_PERCENT: f64 = 80.0;

/// Memory needed per unit of corpus text, as a multiple of its size.
const CORPUS_MEMORY_FACTOR: f64 = 5.0;

/// Snapshot of the host memory counters, in kB.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemInfo {
	pub total_kb: u64,
	pub free_kb: u64,
	pub buffers_kb: u64,
	pub cached_kb: u64,
}

impl MemInfo {
	/// Reads the live counters from `/proc/meminfo`.
	///
	/// # Errors
	/// Returns `ResourceComputation` if the file is missing or incomplete.
	pub fn read() -> LmResult<Self> {
		let content = fs::read_to_string(MEMINFO_PATH)
			.map_err(|e| LmError::ResourceComputation(format!("{MEMINFO_PATH}: {e}")))?;
		Self::parse(&content)
	}

	/// Parses the `/proc/meminfo` format (`Key:   value kB` per line).
	///
	/// # Errors
	/// Returns `ResourceComputation` if a required counter is missing or `MemTotal` is zero.
	pub fn parse(content: &str) -> LmResult<Self> {
		let counters: HashMap<&str, u64> = content
			.lines()
			.filter_map(|line| {
				let mut fields = line.split_whitespace();
				let key = fields.next()?.trim_end_matches(':');
				let value = fields.next()?.parse().ok()?;
				Some((key, value))
			})
			.collect();

		let get = |key: &str| {
			counters
				.get(key)
				.copied()
				.ok_or_else(|| LmError::ResourceComputation(format!("missing {key} counter")))
		};

		let info = Self {
			total_kb: get("MemTotal")?,
			free_kb: get("MemFree")?,
			buffers_kb: get("Buffers")?,
			cached_kb: get("Cached")?,
		};
		if info.total_kb == 0 {
			return Err(LmError::ResourceComputation("MemTotal is zero".to_owned()));
		}
		Ok(info)
	}

	/// Memory budget for a corpus of `input_size_bytes`.
	pub fn budget_percent(&self, input_size_bytes: u64) -> String {
		budget_percent(self.free_kb, self.total_kb, self.buffers_kb, self.cached_kb, input_size_bytes)
	}
}

/// Computes the memory budget of the counting engine, as a percentage of total memory.
///
/// - Caps the budget at 80% of *available* memory (`free + buffers + cached`),
///   not of total, so co-resident jobs are not starved
/// - Scales down for small corpora: 5x the corpus size is enough for the counts
/// - Never returns less than `1%` (nor more than `100%`)
///
/// Example: total 1,000,000 kB, 500,000 kB available and a 100 MiB corpus
/// gives `min(40.0, 0.512)` → `"1%"`.
///
/// # Notes
/// - A zero `total_kb` yields the minimum budget instead of dividing by zero.
pub fn budget_percent(free_kb: u64, total_kb: u64, buffers_kb: u64, cached_kb: u64, input_size_bytes: u64) -> String {
	if total_kb == 0 {
		return "1%".to_owned();
	}

	let total = total_kb as f64;
	let available = free_kb.saturating_add(buffers_kb).saturating_add(cached_kb) as f64;
	let max_percent = MAX_AVAILABLE_PERCENT * available / total;

	let input_kb = input_size_bytes as f64 / 1024.0;
	let raw_percent = CORPUS_MEMORY_FACTOR * input_kb / total;

	let use_percent = max_percent.min(raw_percent).ceil().clamp(1.0, 100.0);
	format!("{}%", use_percent as u32)
}

/// Memory budget for the merged corpus at `merged_corpus`, from live counters.
///
/// Unreadable memory statistics are not fatal: the minimum `1%` is used.
///
/// # Errors
/// Returns an error if the corpus size cannot be read.
pub(crate) fn corpus_budget(merged_corpus: &Path) -> LmResult<String> {
	let size = fs::metadata(merged_corpus)?.len();
	Ok(budget_or_minimum(MemInfo::read(), size))
}

/// Budget from `info`, or `1%` with a warning when the counters could not be read.
fn budget_or_minimum(info: LmResult<MemInfo>, input_size_bytes: u64) -> String {
	match info {
		Ok(info) => info.budget_percent(input_size_bytes),
		Err(e) => {
			log::warn!("{e}, using the minimum memory budget");
			"1%".to_owned()
		}
	}
}
