//! Raw data loading: most-recent-file resolution and delimiter-sniffing CSV parsing

use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::pipeline::error::PipelineError;

/// Number of bytes sampled from the head of a file when sniffing its delimiter.
const SNIFF_SAMPLE_LEN: usize = 4096;

/// Candidate field delimiters, scored in this order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Rows used for CSV schema inference.
const INFER_SCHEMA_LENGTH: usize = 10_000;

/// Return the most recently created entry in `dir`.
///
/// Only immediate entries are considered; subdirectories are not entered.
/// Ties on the creation timestamp break to the first enumerated entry.
/// An empty directory is a configuration error.
pub fn most_recent_file(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;

    let mut latest: Option<(PathBuf, SystemTime)> = None;
    for entry in entries {
        let entry = entry.with_context(|| format!("Failed to list {}", dir.display()))?;
        let metadata = entry
            .metadata()
            .with_context(|| format!("Failed to stat {}", entry.path().display()))?;
        // Creation time is not reported on every filesystem; fall back to
        // the modification time there.
        let created = metadata
            .created()
            .or_else(|_| metadata.modified())
            .with_context(|| format!("No usable timestamp for {}", entry.path().display()))?;

        let newer = match &latest {
            None => true,
            Some((_, best)) => created > *best,
        };
        if newer {
            latest = Some((entry.path(), created));
        }
    }

    match latest {
        Some((path, _)) => Ok(path),
        None => Err(PipelineError::EmptyDirectory(dir.to_path_buf()).into()),
    }
}

/// Infer the field delimiter of a text file from its first 4096 bytes.
///
/// A candidate qualifies when it occurs the same nonzero number of times on
/// every complete sampled line; among qualifiers the highest per-line count
/// wins. Fails when no candidate qualifies.
pub fn sniff_delimiter(path: &Path) -> Result<u8> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open file for sniffing: {}", path.display()))?;
    let mut sample = Vec::with_capacity(SNIFF_SAMPLE_LEN);
    file.take(SNIFF_SAMPLE_LEN as u64)
        .read_to_end(&mut sample)
        .with_context(|| format!("Failed to sample file: {}", path.display()))?;

    let lines = sample_lines(&sample, sample.len() == SNIFF_SAMPLE_LEN);
    if lines.is_empty() {
        return Err(PipelineError::UndetectableDelimiter {
            path: path.to_path_buf(),
            sample_len: SNIFF_SAMPLE_LEN,
        }
        .into());
    }

    let mut best: Option<(u8, usize)> = None;
    for &candidate in &DELIMITER_CANDIDATES {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| line.iter().filter(|&&b| b == candidate).count())
            .collect();

        let first = counts[0];
        let consistent = first > 0 && counts.iter().all(|&c| c == first);
        if !consistent {
            continue;
        }

        let better = match best {
            None => true,
            Some((_, best_count)) => first > best_count,
        };
        if better {
            best = Some((candidate, first));
        }
    }

    match best {
        Some((delimiter, _)) => Ok(delimiter),
        None => Err(PipelineError::UndetectableDelimiter {
            path: path.to_path_buf(),
            sample_len: SNIFF_SAMPLE_LEN,
        }
        .into()),
    }
}

/// Split the sniffing sample into complete lines.
///
/// When the sample was truncated mid-file, the final fragment may end in the
/// middle of a row and is dropped unless it is all we have.
fn sample_lines(sample: &[u8], truncated: bool) -> Vec<&[u8]> {
    let mut lines: Vec<&[u8]> = sample
        .split(|&b| b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .collect();

    if truncated && !sample.ends_with(b"\n") && lines.len() > 1 {
        lines.pop();
    }
    lines
}

/// Parse a full CSV file into a DataFrame with its sniffed delimiter.
///
/// The header is taken from the first row.
pub fn load_table(path: &Path) -> Result<DataFrame> {
    let delimiter = sniff_delimiter(path)?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_LENGTH))
        .with_parse_options(CsvParseOptions::default().with_separator(delimiter))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))?;

    Ok(df)
}

/// Load the most recent raw file in `dir` as a customer-record table.
pub fn data_load_pipeline(dir: &Path) -> Result<DataFrame> {
    debug!("Starting data load");
    let most_recent = most_recent_file(dir)?;
    debug!("Most recent file path: {}. Loading data", most_recent.display());
    let data = load_table(&most_recent)?;
    debug!("Data loaded");
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_lines_drops_trailing_fragment() {
        let sample = b"a,b,c\n1,2,3\n4,5";
        let lines = sample_lines(sample, true);
        assert_eq!(lines, vec![b"a,b,c".as_slice(), b"1,2,3".as_slice()]);
    }

    #[test]
    fn test_sample_lines_keeps_complete_input() {
        let sample = b"a;b\n1;2\n";
        let lines = sample_lines(sample, false);
        assert_eq!(lines.len(), 2);
    }
}
