use crate::db::InputSpec;
use crate::pipeline::{Cap, Derivation};
use crate::stats::Statistic;
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The grouping column of a report and its declared axis order. Rows whose
/// level is not in `order` are dropped before aggregation and plotting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorSpec {
    pub column: String,
    #[serde(default)]
    pub order: Vec<String>,
}

impl FactorSpec {
    pub fn new(column: impl Into<String>, order: &[&str]) -> Self {
        Self {
            column: column.into(),
            order: order.iter().map(|level| level.to_string()).collect(),
        }
    }
}

/// One metric column of a report, with an optional axis label and an optional
/// outlier cap local to this metric's charts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSpec {
    pub column: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub cap: Option<Cap>,
}

impl MetricSpec {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            label: None,
            cap: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn cap(mut self, cap: Cap) -> Self {
        self.cap = Some(cap);
        self
    }

    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.column)
    }
}

fn default_bins() -> usize {
    12
}

fn default_bar_stat() -> Statistic {
    Statistic::Mean
}

/// A chart family of a report. `Box`, `Histogram`, `MedianLine` and
/// `Scatter` produce one artifact per metric; the bar kinds name their value
/// columns explicitly and produce a single artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Box {
        #[serde(default)]
        horizontal: bool,
    },
    Histogram {
        #[serde(default = "default_bins")]
        bins: usize,
        #[serde(default)]
        hue: Option<String>,
    },
    MedianLine,
    /// `x` metric against every other metric of the report.
    Scatter {
        x: String,
        #[serde(default)]
        hue: Option<String>,
    },
    /// One bar cluster per factor level, one bar per level of `series`.
    GroupedBar {
        value: String,
        series: String,
        #[serde(default = "default_bar_stat")]
        statistic: Statistic,
    },
    /// One stacked bar per factor level, one segment per listed column.
    StackedBar { columns: Vec<String> },
}

/// A printed descriptive block for a subgroup of rows (e.g. fast vs slow
/// failovers), selected by a range on one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescribeSpec {
    pub label: String,
    pub filter_metric: String,
    pub filter: Cap,
    pub columns: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Everything one report run needs, serializable so that a report can live in
/// a JSON file next to the data instead of in code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub inputs: Vec<InputSpec>,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub numeric_columns: Vec<String>,
    #[serde(default)]
    pub derivations: Vec<Derivation>,
    pub factor: FactorSpec,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    #[serde(default)]
    pub charts: Vec<ChartSpec>,
    /// Where to write the factor-level summary statistics, if anywhere.
    #[serde(default)]
    pub aggregate_csv: Option<PathBuf>,
    /// Hex color cycle overriding the built-in palette.
    #[serde(default)]
    pub palette: Option<Vec<String>>,
    #[serde(default)]
    pub describes: Vec<DescribeSpec>,
    /// Print a correlation matrix over the numeric columns.
    #[serde(default)]
    pub correlation: bool,
    /// Print the aggregate table to the console.
    #[serde(default = "default_true")]
    pub print_summary: bool,
}

impl ReportConfig {
    pub fn new(name: impl Into<String>, output_dir: impl Into<PathBuf>, factor: FactorSpec) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            output_dir: output_dir.into(),
            numeric_columns: Vec::new(),
            derivations: Vec::new(),
            factor,
            metrics: Vec::new(),
            charts: Vec::new(),
            aggregate_csv: None,
            palette: None,
            describes: Vec::new(),
            correlation: false,
            print_summary: true,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, Report> {
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("open report config {}", path.display()))?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))
            .wrap_err_with(|| format!("parse report config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), Report> {
        let file = std::fs::File::create(path)
            .wrap_err_with(|| format!("create report config {}", path.display()))?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)
            .wrap_err("serialize report config")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::FilenameRule;

    #[test]
    fn json_round_trip() {
        let mut config = ReportConfig::new(
            "failover",
            "failover_plots",
            FactorSpec::new("ProbePeriod", &["1s", "3s", "5s", "7s", "10s"]),
        );
        config.inputs.push(
            InputSpec::new("failover_summary_*s.csv").filename_rule(
                FilenameRule::LastToken {
                    column: "ProbePeriod".to_string(),
                    separator: '_',
                },
            ),
        );
        config
            .numeric_columns
            .extend(["SwitchTime".to_string(), "MeanLatency(ms)".to_string()]);
        config.derivations.push(Derivation::ErrorRate {
            success: "SuccessCount".to_string(),
            error: "ErrorCount".to_string(),
            output: "CalculatedErrorRate".to_string(),
            percent: false,
        });
        config
            .metrics
            .push(MetricSpec::new("SwitchTime").cap(Cap::at_most(50.0)));
        config.charts.push(ChartSpec::Box { horizontal: false });
        config.charts.push(ChartSpec::Scatter {
            x: "SwitchTime".to_string(),
            hue: None,
        });

        let json = serde_json::to_string_pretty(&config).unwrap();
        let back: ReportConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, "failover");
        assert_eq!(back.factor.order.len(), 5);
        assert_eq!(back.metrics[0].column, "SwitchTime");
        assert!(matches!(back.charts[0], ChartSpec::Box { horizontal: false }));
        assert!(back.print_summary);
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let json = r#"{
            "name": "t",
            "inputs": [{"pattern": "a.csv"}],
            "output_dir": "plots",
            "factor": {"column": "Retries"}
        }"#;
        let config: ReportConfig = serde_json::from_str(json).unwrap();
        assert!(config.factor.order.is_empty());
        assert!(config.metrics.is_empty());
        assert!(config.print_summary);
        assert!(!config.correlation);
    }
}
