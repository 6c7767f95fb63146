use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::columns::{has_required_columns, UsageRow};

/// Default per-file size cap
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Structural ingestion failures. Row-level problems never surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{}: not a CSV file", .path.display())]
    NotCsv { path: PathBuf },

    #[error("{}: cannot read file: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: file is {size_mb:.1} MB, exceeds the {limit_mb} MB limit", .path.display())]
    TooLarge {
        path: PathBuf,
        size_mb: f64,
        limit_mb: u64,
    },

    #[error("{}: file has an empty header row", .path.display())]
    EmptyHeaders { path: PathBuf },

    #[error("{}: missing required columns (expected a cost or model column)", .path.display())]
    MissingColumns { path: PathBuf },

    #[error("{}: failed to parse CSV: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("No CSV files found. Please upload CSV files or a folder containing them.")]
    NoCsvFiles,

    #[error("{}", format_failures(.0))]
    AllFilesFailed(Vec<IngestError>),
}

fn format_failures(errors: &[IngestError]) -> String {
    let mut out = format!("All {} file(s) failed to load:", errors.len());
    for e in errors {
        out.push_str("\n  - ");
        out.push_str(&e.to_string());
    }
    out
}

/// Ingestion limits
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub max_file_size_mb: u64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
        }
    }
}

/// Emitted after each file finishes, successfully or not
#[derive(Debug, Clone)]
pub struct IngestProgress<'a> {
    pub file: &'a Path,
    pub index: usize,
    pub total: usize,
    pub percent: u32,
}

/// Rows gathered from every file that passed structural validation
#[derive(Debug, Default)]
pub struct IngestOutcome {
    pub rows: Vec<UsageRow>,
    pub files_analyzed: usize,
    /// Files that failed; non-fatal because at least one other file loaded
    pub warnings: Vec<IngestError>,
}

/// Load every CSV reachable from `inputs`, one file at a time.
///
/// Fails only when nothing could be loaded: no CSV files at all, or every
/// candidate file failed structurally.
pub fn ingest<F>(
    inputs: &[PathBuf],
    options: &IngestOptions,
    mut on_progress: F,
) -> Result<IngestOutcome, IngestError>
where
    F: FnMut(IngestProgress<'_>),
{
    let (files, mut failures) = discover_csv_files(inputs);

    if files.is_empty() {
        return Err(if failures.is_empty() {
            IngestError::NoCsvFiles
        } else {
            IngestError::AllFilesFailed(failures)
        });
    }

    debug!(count = files.len(), "discovered CSV files");

    let total = files.len();
    let mut outcome = IngestOutcome::default();

    for (i, path) in files.iter().enumerate() {
        match load_file(path, options) {
            Ok(rows) => {
                debug!(file = %path.display(), rows = rows.len(), "loaded CSV file");
                outcome.rows.extend(rows);
                outcome.files_analyzed += 1;
            }
            Err(e) => {
                debug!(file = %path.display(), error = %e, "skipping CSV file");
                failures.push(e);
            }
        }

        let index = i + 1;
        on_progress(IngestProgress {
            file: path,
            index,
            total,
            percent: ((index as f64 / total as f64) * 100.0).round() as u32,
        });
    }

    if outcome.files_analyzed == 0 {
        return Err(IngestError::AllFilesFailed(failures));
    }

    outcome.warnings = failures;
    Ok(outcome)
}

/// Expand inputs into a de-duplicated list of CSV files.
///
/// Directories are walked recursively and non-CSV files inside them are ignored.
/// A non-CSV file named explicitly is reported as an error.
pub fn discover_csv_files(inputs: &[PathBuf]) -> (Vec<PathBuf>, Vec<IngestError>) {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut files = Vec::new();
    let mut errors = Vec::new();

    let mut push_unique = |path: PathBuf, files: &mut Vec<PathBuf>| {
        let key = path.canonicalize().unwrap_or_else(|_| path.clone());
        if seen.insert(key) {
            files.push(path);
        }
    };

    for input in inputs {
        if input.is_dir() {
            for path in collect_csv_files(input) {
                push_unique(path, &mut files);
            }
        } else if !input.exists() {
            errors.push(IngestError::Unreadable {
                path: input.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        } else if is_csv_path(input) {
            push_unique(input.clone(), &mut files);
        } else {
            errors.push(IngestError::NotCsv {
                path: input.clone(),
            });
        }
    }

    (files, errors)
}

/// Collect all .csv files recursively under a directory, sorted for stable ordering
fn collect_csv_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut entries: Vec<PathBuf> = match std::fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read directory");
            return files;
        }
    };
    entries.sort();

    for path in entries {
        if path.is_dir() {
            files.extend(collect_csv_files(&path));
        } else if is_csv_path(&path) {
            files.push(path);
        }
    }
    files
}

fn is_csv_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Read and validate one CSV file
pub fn load_file(path: &Path, options: &IngestOptions) -> Result<Vec<UsageRow>, IngestError> {
    let metadata = std::fs::metadata(path).map_err(|source| IngestError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if metadata.len() > options.max_file_size_mb * BYTES_PER_MB {
        return Err(IngestError::TooLarge {
            path: path.to_path_buf(),
            size_mb: metadata.len() as f64 / BYTES_PER_MB as f64,
            limit_mb: options.max_file_size_mb,
        });
    }

    let file = File::open(path).map_err(|source| IngestError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    parse_csv(BufReader::new(file), path)
}

/// Parse CSV content with a mandatory header row, dropping blank rows
pub fn parse_csv<R: Read>(reader: R, path: &Path) -> Result<Vec<UsageRow>, IngestError> {
    let parse_err = |source: csv::Error| IngestError::Parse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(parse_err)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::EmptyHeaders {
            path: path.to_path_buf(),
        });
    }

    if !has_required_columns(&headers) {
        return Err(IngestError::MissingColumns {
            path: path.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_err)?;
        let row = UsageRow::new(
            headers
                .iter()
                .zip(record.iter())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect(),
        );
        if !row.is_blank() {
            rows.push(row);
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::columns::find_column;
    use std::fs;

    fn parse(content: &str) -> Result<Vec<UsageRow>, IngestError> {
        parse_csv(content.as_bytes(), Path::new("test.csv"))
    }

    #[test]
    fn test_parse_csv_basic() {
        let rows = parse("Model,Cost\nGPT-4,10.00\nClaude,5.00\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(find_column(&rows[1], &["model"]), Some("Claude"));
    }

    #[test]
    fn test_parse_csv_drops_blank_rows() {
        let rows = parse("model,cost\n,\ngpt-4,1\n , \n").unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_parse_csv_short_records() {
        let rows = parse("model,cost,tokens\ngpt-4,2\n").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(find_column(&rows[0], &["tokens"]), None);
    }

    #[test]
    fn test_parse_csv_empty_file() {
        assert!(matches!(parse(""), Err(IngestError::EmptyHeaders { .. })));
        assert!(matches!(parse(" , \n1,2\n"), Err(IngestError::EmptyHeaders { .. })));
    }

    #[test]
    fn test_parse_csv_missing_required_columns() {
        let err = parse("foo,bar\n1,2\n").unwrap_err();
        assert!(matches!(err, IngestError::MissingColumns { .. }));
        assert!(err.to_string().contains("missing required columns"));
    }

    #[test]
    fn test_parse_csv_invalid_utf8() {
        let bytes: &[u8] = b"model,cost\n\xff\xfe,1\n";
        let err = parse_csv(bytes, Path::new("bad.csv")).unwrap_err();
        assert!(matches!(err, IngestError::Parse { .. }));
    }

    #[test]
    fn test_discover_walks_directories_and_dedupes() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("a.csv"), "model\nx\n").unwrap();
        fs::write(nested.join("b.CSV"), "model\ny\n").unwrap();
        fs::write(nested.join("notes.txt"), "ignored").unwrap();

        let inputs = vec![dir.path().to_path_buf(), dir.path().join("a.csv")];
        let (files, errors) = discover_csv_files(&inputs);
        assert_eq!(files.len(), 2);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_discover_rejects_explicit_non_csv() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("usage.txt");
        fs::write(&txt, "model\nx\n").unwrap();

        let (files, errors) = discover_csv_files(&[txt]);
        assert!(files.is_empty());
        assert!(matches!(errors[0], IngestError::NotCsv { .. }));
    }

    #[test]
    fn test_ingest_partial_failure_keeps_valid_rows() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.csv"), "model,cost\ngpt-4,1\nclaude,2\n").unwrap();
        fs::write(dir.path().join("bad.csv"), "foo,bar\n1,2\n").unwrap();

        let mut percents = Vec::new();
        let outcome = ingest(
            &[dir.path().to_path_buf()],
            &IngestOptions::default(),
            |p| percents.push(p.percent),
        )
        .unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.files_analyzed, 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(percents, vec![50, 100]);
    }

    #[test]
    fn test_ingest_all_files_fail() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.csv"), "foo,bar\n1,2\n").unwrap();

        let err = ingest(&[dir.path().to_path_buf()], &IngestOptions::default(), |_| {})
            .unwrap_err();
        match err {
            IngestError::AllFilesFailed(errors) => assert_eq!(errors.len(), 1),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_ingest_no_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = ingest(&[dir.path().to_path_buf()], &IngestOptions::default(), |_| {})
            .unwrap_err();
        assert!(matches!(err, IngestError::NoCsvFiles));
    }

    #[test]
    fn test_load_file_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");
        fs::write(&path, "model,cost\n").unwrap();

        let options = IngestOptions {
            max_file_size_mb: 0,
        };
        let err = load_file(&path, &options).unwrap_err();
        assert!(matches!(err, IngestError::TooLarge { .. }));
    }
}
