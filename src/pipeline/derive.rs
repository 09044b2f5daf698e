use crate::db::{MetricTable, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

/// A declarative rule computing one new column from existing ones.
///
/// Rules are pure and idempotent: re-running a rule on an already-derived
/// table reproduces identical values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Derivation {
    /// `error / (success + error)`; missing when the denominator is not
    /// positive or either input is missing.
    ErrorRate {
        success: String,
        error: String,
        output: String,
        #[serde(default)]
        percent: bool,
    },
    /// `1 - error_rate`; missing when the input is missing.
    Availability { error_rate: String, output: String },
    /// Count of one status code parsed out of a `code:count code:count`
    /// string, optionally divided by a per-row total column.
    StatusFraction {
        source: String,
        code: u16,
        #[serde(default)]
        total: Option<String>,
        output: String,
    },
}

impl Derivation {
    pub fn output(&self) -> &str {
        match self {
            Derivation::ErrorRate { output, .. } => output,
            Derivation::Availability { output, .. } => output,
            Derivation::StatusFraction { output, .. } => output,
        }
    }

    fn inputs(&self) -> Vec<&str> {
        match self {
            Derivation::ErrorRate { success, error, .. } => vec![success, error],
            Derivation::Availability { error_rate, .. } => vec![error_rate],
            Derivation::StatusFraction { source, total, .. } => {
                let mut inputs = vec![source.as_str()];
                if let Some(total) = total {
                    inputs.push(total);
                }
                inputs
            }
        }
    }

    /// Applies the rule, writing its output column into `table`. A rule whose
    /// input columns are absent is skipped, never an error.
    pub fn apply(&self, table: &mut MetricTable) -> bool {
        for input in self.inputs() {
            if !table.has_column(input) {
                warn!(
                    rule = ?self.output(),
                    column = input,
                    "derivation input column absent; rule skipped"
                );
                return false;
            }
        }

        for row in 0..table.len() {
            let value = self.compute(table, row);
            let output = self.output().to_string();
            table.set(row, &output, value);
        }
        // register the output column even on empty tables
        let output = self.output().to_string();
        table.ensure_column(&output);
        true
    }

    fn compute(&self, table: &MetricTable, row: usize) -> Value {
        match self {
            Derivation::ErrorRate {
                success,
                error,
                percent,
                ..
            } => {
                let success = table.get(row, success).as_f64();
                let error = table.get(row, error).as_f64();
                match (success, error) {
                    (Some(success), Some(error)) if success + error > 0.0 => {
                        let rate = error / (success + error);
                        Value::Num(if *percent { rate * 100.0 } else { rate })
                    }
                    _ => Value::Missing,
                }
            }
            Derivation::Availability { error_rate, .. } => {
                match table.get(row, error_rate).as_f64() {
                    Some(rate) => Value::Num(1.0 - rate),
                    None => Value::Missing,
                }
            }
            Derivation::StatusFraction {
                source,
                code,
                total,
                ..
            } => {
                let count = match table.get(row, source) {
                    Value::Str(text) => status_count(text, *code),
                    // already-numeric or missing source: tolerated as zero
                    _ => 0,
                } as f64;
                match total {
                    Some(total) => match table.get(row, total).as_f64() {
                        Some(total) if total > 0.0 => Value::Num(count / total),
                        _ => Value::Missing,
                    },
                    None => Value::Num(count),
                }
            }
        }
    }
}

/// Applies rules in declaration order; returns the outputs actually written.
pub fn apply_all(derivations: &[Derivation], table: &mut MetricTable) -> Vec<String> {
    derivations
        .iter()
        .filter(|derivation| derivation.apply(table))
        .map(|derivation| derivation.output().to_string())
        .collect()
}

/// Parses a whitespace-separated `code:count` string. Malformed tokens are
/// dropped; an absent code simply never appears in the map.
pub fn parse_status_codes(text: &str) -> BTreeMap<u16, u64> {
    let mut codes = BTreeMap::new();
    for token in text.split_whitespace() {
        let (code, count) = match token.split_once(':') {
            Some(parts) => parts,
            None => continue,
        };
        let code = match code.trim().parse::<u16>() {
            Ok(code) => code,
            Err(_) => continue,
        };
        let count = match count.trim().parse::<u64>() {
            Ok(count) => count,
            Err(_) => continue,
        };
        *codes.entry(code).or_insert(0) += count;
    }
    codes
}

/// Count for one code; 0 when absent or malformed.
pub fn status_count(text: &str, code: u16) -> u64 {
    parse_status_codes(text).get(&code).copied().unwrap_or(0)
}
