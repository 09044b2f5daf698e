use crate::db::table::{MetricTable, Value};
use color_eyre::eyre::{self, WrapErr};
use color_eyre::Report;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A constant column attached to every row of one input, mirroring the
/// per-file labels of the summaries (retry count, request volume, scenario).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub column: String,
    pub value: TagValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Num(f64),
    Str(String),
}

impl TagValue {
    fn to_value(&self) -> Value {
        match self {
            TagValue::Num(value) => Value::Num(*value),
            TagValue::Str(value) => Value::Str(value.clone()),
        }
    }
}

/// How to pull a factor level out of a filename.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilenameRule {
    /// The whole file stem (`failover_summary_5s.csv` -> `failover_summary_5s`).
    Stem { column: String },
    /// The last `separator`-delimited token of the stem
    /// (`failover_summary_5s.csv` -> `5s`).
    LastToken { column: String, separator: char },
}

impl FilenameRule {
    pub fn column(&self) -> &str {
        match self {
            FilenameRule::Stem { column } => column,
            FilenameRule::LastToken { column, .. } => column,
        }
    }

    fn extract(&self, path: &Path) -> Option<String> {
        let stem = path.file_stem()?.to_str()?;
        match self {
            FilenameRule::Stem { .. } => Some(stem.to_string()),
            FilenameRule::LastToken { separator, .. } => {
                stem.rsplit(*separator).next().map(|token| token.to_string())
            }
        }
    }
}

/// One input of a report: a path or glob pattern plus the columns to attach
/// to every row it contributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSpec {
    pub pattern: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub filename_rule: Option<FilenameRule>,
    /// Keep only the first N data rows of each matched file.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl InputSpec {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            tags: Vec::new(),
            filename_rule: None,
            limit: None,
        }
    }

    pub fn tag_str(mut self, column: &str, value: &str) -> Self {
        self.tags.push(Tag {
            column: column.to_string(),
            value: TagValue::Str(value.to_string()),
        });
        self
    }

    pub fn tag_num(mut self, column: &str, value: f64) -> Self {
        self.tags.push(Tag {
            column: column.to_string(),
            value: TagValue::Num(value),
        });
        self
    }

    pub fn filename_rule(mut self, rule: FilenameRule) -> Self {
        self.filename_rule = Some(rule);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// What happened during a load, for observability.
#[derive(Debug, Default, Clone)]
pub struct LoadSummary {
    pub files_loaded: usize,
    pub files_missing: Vec<String>,
    pub rows_skipped: usize,
}

/// Loads every input into a single table, file order then in-file order.
///
/// A missing file is reported and skipped; the load only fails when not a
/// single input could be read.
pub fn load_all(inputs: &[InputSpec]) -> Result<(MetricTable, LoadSummary), Report> {
    let mut table = MetricTable::new();
    let mut summary = LoadSummary::default();

    for input in inputs {
        let paths = expand(&input.pattern)?;
        if paths.is_empty() {
            warn!(pattern = %input.pattern, "no file matches input");
            summary.files_missing.push(input.pattern.clone());
            continue;
        }
        for path in paths {
            match load_file(&path, input) {
                Ok((file_table, skipped)) => {
                    debug!(path = %path.display(), rows = file_table.len(), "loaded");
                    summary.files_loaded += 1;
                    summary.rows_skipped += skipped;
                    table.append(file_table);
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable input");
                    summary.files_missing.push(path.display().to_string());
                }
            }
        }
    }

    if summary.files_loaded == 0 {
        eyre::bail!(
            "none of the declared inputs could be read: {:?}",
            inputs.iter().map(|input| &input.pattern).collect::<Vec<_>>()
        );
    }
    Ok((table, summary))
}

/// Expands a glob pattern into sorted paths; a plain path maps to itself so
/// that its absence is reported as a missing file, not a glob mismatch.
fn expand(pattern: &str) -> Result<Vec<PathBuf>, Report> {
    if !pattern.contains(&['*', '?', '['][..]) {
        let path = PathBuf::from(pattern);
        return Ok(if path.is_file() { vec![path] } else { vec![] });
    }
    let mut paths = Vec::new();
    let entries = glob::glob(pattern).wrap_err_with(|| format!("bad glob pattern {}", pattern))?;
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path),
            Err(error) => warn!(%error, "unreadable glob entry"),
        }
    }
    paths.sort();
    Ok(paths)
}

/// Reads one CSV file. Ragged rows (wrong field count, usually from mangled
/// quoting) are counted and skipped, never fatal for the file.
fn load_file(path: &Path, input: &InputSpec) -> Result<(MetricTable, usize), Report> {
    let mut reader = csv::Reader::from_path(path)
        .wrap_err_with(|| format!("open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .wrap_err_with(|| format!("read header of {}", path.display()))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    let mut table = MetricTable::new();
    for header in &headers {
        table.ensure_column(header);
    }

    let mut skipped = 0;
    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                // malformed row (e.g. ragged quoting): skip it, keep the file
                debug!(path = %path.display(), %error, "skipping malformed row");
                skipped += 1;
                continue;
            }
        };
        let mut row = HashMap::new();
        for (header, field) in headers.iter().zip(record.iter()) {
            let field = field.trim();
            let value = if field.is_empty() {
                Value::Missing
            } else {
                Value::Str(field.to_string())
            };
            row.insert(header.clone(), value);
        }
        table.push_row(row);
    }

    if let Some(limit) = input.limit {
        table.truncate(limit);
    }

    // tag provenance and any filename-encoded factor
    let source = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<unknown>")
        .to_string();
    table.set_all("SourceFile", Value::Str(source));
    if let Some(rule) = &input.filename_rule {
        if let Some(level) = rule.extract(path) {
            table.set_all(rule.column(), Value::Str(level));
        } else {
            warn!(path = %path.display(), "filename rule matched nothing");
        }
    }
    for tag in &input.tags {
        table.set_all(&tag.column, tag.value.to_value());
    }

    Ok((table, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            &dir,
            "failover_summary_5s.csv",
            "SwitchTime,MeanLatency(ms)\n23.5,120\n24.1,130\n",
        );
        let pattern = dir
            .path()
            .join("failover_summary_*s.csv")
            .display()
            .to_string();

        let input = InputSpec::new(pattern).filename_rule(FilenameRule::LastToken {
            column: "ProbePeriod".to_string(),
            separator: '_',
        });
        let (table, summary) = load_all(&[input]).unwrap();

        assert_eq!(summary.files_loaded, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get(0, "ProbePeriod"),
            &Value::Str("5s".to_string())
        );
        assert_eq!(
            table.get(1, "SourceFile"),
            &Value::Str("failover_summary_5s.csv".to_string())
        );
    }

    #[test]
    fn skips_ragged_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "summary.csv",
            "A,B\n1,2\nx,y,z,w\n4,5\n",
        );

        let (table, summary) =
            load_all(&[InputSpec::new(path.display().to_string())]).unwrap();
        assert_eq!(summary.rows_skipped, 1);
        // the good rows around the bad one survive
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "A"), &Value::Str("1".to_string()));
        assert_eq!(table.get(1, "B"), &Value::Str("5".to_string()));
    }

    #[test]
    fn missing_file_is_batch_recoverable() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "good.csv", "A\n1\n");
        let bad = dir.path().join("absent.csv");

        let inputs = vec![
            InputSpec::new(bad.display().to_string()),
            InputSpec::new(good.display().to_string()),
        ];
        let (table, summary) = load_all(&inputs).unwrap();
        assert_eq!(summary.files_loaded, 1);
        assert_eq!(summary.files_missing.len(), 1);
        assert_eq!(table.len(), 1);

        // and fatal only when everything is absent
        let all_bad = vec![InputSpec::new(bad.display().to_string())];
        assert!(load_all(&all_bad).is_err());
    }

    #[test]
    fn truncates_and_tags_constants() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "retries.csv", "A\n1\n2\n3\n4\n");

        let input = InputSpec::new(path.display().to_string())
            .tag_num("RetryCount", 5.0)
            .tag_str("Scenario", "enabled")
            .limit(2);
        let (table, _) = load_all(&[input]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "RetryCount"), &Value::Num(5.0));
        assert_eq!(table.get(1, "Scenario"), &Value::Str("enabled".to_string()));
    }

    #[test]
    fn header_only_file_yields_empty_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "empty.csv", "A,B\n");
        let (table, summary) =
            load_all(&[InputSpec::new(path.display().to_string())]).unwrap();
        assert_eq!(summary.files_loaded, 1);
        assert!(table.is_empty());
        assert!(table.has_column("A"));
    }
}
