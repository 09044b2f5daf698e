use crate::db::{MetricTable, Value};
use crate::stats::{pearson, Sample, Statistic};
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use std::collections::HashMap;
use std::path::Path;

/// The statistics requested for one metric of a summary table.
#[derive(Debug, Clone)]
pub struct AggSpec {
    pub metric: String,
    pub stats: Vec<Statistic>,
}

impl AggSpec {
    pub fn new(metric: impl Into<String>, stats: &[Statistic]) -> Self {
        Self {
            metric: metric.into(),
            stats: stats.to_vec(),
        }
    }

    /// The usual block: count, median, mean, std, min, max.
    pub fn standard(metric: impl Into<String>) -> Self {
        Self::new(
            metric,
            &[
                Statistic::Count,
                Statistic::Median,
                Statistic::Mean,
                Statistic::StdDev,
                Statistic::Min,
                Statistic::Max,
            ],
        )
    }
}

/// Groups `table` by the factor column and computes the requested statistics
/// over non-missing values only. One output row per factor level present;
/// levels named in `order` come first, in that order, then any remaining
/// level in first-seen order. Levels with no rows are omitted.
pub fn aggregate(
    table: &MetricTable,
    factor: &str,
    order: &[String],
    specs: &[AggSpec],
) -> MetricTable {
    // factor level -> row indices, preserving first-seen order for levels
    // outside the declared order
    let labels = table.labels(factor);
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut seen: Vec<String> = Vec::new();
    for (row, label) in labels.into_iter().enumerate() {
        let label = match label {
            Some(label) => label,
            None => continue,
        };
        if !groups.contains_key(&label) {
            seen.push(label.clone());
        }
        groups.entry(label).or_default().push(row);
    }

    let mut levels: Vec<String> = order
        .iter()
        .filter(|level| groups.contains_key(*level))
        .cloned()
        .collect();
    for level in seen {
        if !levels.contains(&level) {
            levels.push(level);
        }
    }

    let mut summary = MetricTable::new();
    for level in levels {
        let rows = &groups[&level];
        let mut out: HashMap<String, Value> = HashMap::new();
        out.insert(factor.to_string(), Value::Str(level));
        for spec in specs {
            let sample = Sample::from(
                rows.iter()
                    .filter_map(|row| table.get(*row, &spec.metric).as_f64()),
            );
            for stat in &spec.stats {
                let name = format!("{}_{}", spec.metric, stat.name());
                let value = sample
                    .statistic(*stat)
                    .map(Value::Num)
                    .unwrap_or(Value::Missing);
                out.insert(name, value);
            }
        }
        summary.push_row(out);
    }

    // deterministic column order: factor first, then metric stats as declared
    let mut ordered = MetricTable::new();
    ordered.ensure_column(factor);
    for spec in specs {
        for stat in &spec.stats {
            ordered.ensure_column(&format!("{}_{}", spec.metric, stat.name()));
        }
    }
    ordered.append(summary);
    ordered
}

/// Writes a summary table as CSV; missing cells become empty fields.
pub fn write_csv(table: &MetricTable, path: &Path) -> Result<(), Report> {
    let mut writer = csv::Writer::from_path(path)
        .wrap_err_with(|| format!("create {}", path.display()))?;
    writer.write_record(table.columns())?;
    for row in 0..table.len() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|column| match table.get(row, column) {
                Value::Num(value) => format!("{}", value),
                Value::Str(value) => value.clone(),
                Value::Missing => String::new(),
            })
            .collect();
        writer.write_record(&record)?;
    }
    writer.flush().wrap_err("flush summary csv")?;
    Ok(())
}

/// Per-metric descriptive block over the whole table: count, mean, std, min,
/// p25, p50, p75, max. One row per metric.
pub fn describe(table: &MetricTable, metrics: &[String]) -> MetricTable {
    let mut out = MetricTable::new();
    out.ensure_column("Metric");
    for name in ["count", "mean", "std", "min", "p25", "p50", "p75", "max"] {
        out.ensure_column(name);
    }
    for metric in metrics {
        if !table.has_column(metric) {
            continue;
        }
        let sample = table.sample(metric);
        let mut row: HashMap<String, Value> = HashMap::new();
        row.insert("Metric".to_string(), Value::Str(metric.clone()));
        let cells: [(&str, Option<f64>); 8] = [
            ("count", Some(sample.count() as f64)),
            ("mean", sample.mean()),
            ("std", sample.stddev()),
            ("min", sample.min()),
            ("p25", sample.percentile(0.25)),
            ("p50", sample.median()),
            ("p75", sample.percentile(0.75)),
            ("max", sample.max()),
        ];
        for (name, value) in cells {
            row.insert(
                name.to_string(),
                value.map(Value::Num).unwrap_or(Value::Missing),
            );
        }
        out.push_row(row);
    }
    out
}

/// Pearson correlation matrix over the listed columns, computed pairwise on
/// rows where both values are present.
pub fn correlation_matrix(table: &MetricTable, columns: &[String]) -> MetricTable {
    let present: Vec<&String> = columns
        .iter()
        .filter(|column| table.has_column(column))
        .collect();

    let numbers: HashMap<&String, Vec<Option<f64>>> = present
        .iter()
        .map(|column| (*column, table.numbers(column)))
        .collect();

    let mut out = MetricTable::new();
    out.ensure_column("Column");
    for column in &present {
        out.ensure_column(column);
    }
    for left in &present {
        let mut row: HashMap<String, Value> = HashMap::new();
        row.insert("Column".to_string(), Value::Str((*left).clone()));
        for right in &present {
            let pairs: Vec<(f64, f64)> = numbers[*left]
                .iter()
                .zip(numbers[*right].iter())
                .filter_map(|(x, y)| match (x, y) {
                    (Some(x), Some(y)) => Some((*x, *y)),
                    _ => None,
                })
                .collect();
            let value = if left == right && !pairs.is_empty() {
                Some(1.0)
            } else {
                pearson(&pairs)
            };
            row.insert(
                (*right).clone(),
                value.map(Value::Num).unwrap_or(Value::Missing),
            );
        }
        out.push_row(row);
    }
    out
}
