use crate::config::{ChartSpec, DescribeSpec, MetricSpec, ReportConfig};
use crate::db::{self, MetricTable};
use crate::fmt::PlotFmt;
use crate::pipeline::{
    self, aggregate, correlation_matrix, metric_view, AggSpec, FactorAllowList,
};
use crate::plot::{self, Palette};
use crate::stats::Statistic;
use color_eyre::eyre::WrapErr;
use color_eyre::Report;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

/// What one report run produced, for observability and for tests.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub artifacts: Vec<PathBuf>,
    pub rows_loaded: usize,
    pub rows_outside_factor: usize,
    /// Per metric: rows excluded from that metric's charts by its cap.
    pub rows_capped: HashMap<String, usize>,
    pub coercion_failures: usize,
    pub missing_columns: Vec<String>,
    pub skipped_charts: Vec<String>,
}

/// Runs one report end to end: load, coerce, derive, filter, aggregate,
/// render. Failures stay local: a missing file, column or metric costs that
/// piece of output, never the run.
pub fn generate(config: &ReportConfig) -> Result<RunSummary, Report> {
    info!(report = %config.name, "generating report");
    std::fs::create_dir_all(&config.output_dir).wrap_err_with(|| {
        format!("create output directory {}", config.output_dir.display())
    })?;
    let palette = match &config.palette {
        Some(hex) => Palette::from_hex(hex).wrap_err("parse palette")?,
        None => Palette::default(),
    };

    let mut summary = RunSummary::default();

    // load + coerce
    let (mut table, load) = db::load_all(&config.inputs).wrap_err("load inputs")?;
    summary.rows_loaded = table.len();
    if load.rows_skipped > 0 {
        warn!(rows = load.rows_skipped, "skipped malformed input rows");
    }
    let coercion = table.coerce_numeric(&config.numeric_columns);
    summary.coercion_failures = coercion.failed_cells;
    for column in &coercion.missing_columns {
        warn!(column = %column, "declared numeric column absent from inputs");
    }
    summary.missing_columns = coercion.missing_columns;

    // derive + factor filter
    pipeline::apply_all(&config.derivations, &mut table);
    if !config.factor.order.is_empty() {
        let allow = FactorAllowList {
            column: config.factor.column.clone(),
            order: config.factor.order.clone(),
        };
        summary.rows_outside_factor = allow.apply(&mut table);
    }

    // metrics present in the loaded data; the rest are warned away
    let metrics: Vec<&MetricSpec> = config
        .metrics
        .iter()
        .filter(|metric| {
            let present = table.has_column(&metric.column);
            if !present {
                warn!(metric = %metric.column, "metric column absent; charts skipped");
                summary.skipped_charts.push(metric.column.clone());
            }
            present
        })
        .collect();

    // one capped view per metric, shared by every chart kind
    let views: HashMap<String, MetricTable> = metrics
        .iter()
        .map(|metric| {
            let (view, stats) =
                metric_view(&table, &metric.column, metric.cap.as_ref());
            if stats.out_of_bounds > 0 {
                info!(
                    metric = %metric.column,
                    removed = stats.out_of_bounds,
                    "rows excluded by outlier cap"
                );
            }
            summary
                .rows_capped
                .insert(metric.column.clone(), stats.out_of_bounds);
            (metric.column.clone(), view)
        })
        .collect();

    // aggregate table: every requested statistic for every present metric
    let specs: Vec<AggSpec> = metrics
        .iter()
        .map(|metric| AggSpec::new(&metric.column, &Statistic::ALL))
        .collect();
    let aggregated = aggregate(&table, &config.factor.column, &config.factor.order, &specs);
    if config.print_summary && !aggregated.is_empty() {
        println!(">>>>>>>> {} | by {} <<<<<<<<", config.name, config.factor.column);
        println!("{}", aggregated);
    }
    if let Some(path) = &config.aggregate_csv {
        let path = if path.is_relative() {
            config.output_dir.join(path)
        } else {
            path.clone()
        };
        pipeline::write_csv(&aggregated, &path).wrap_err("write aggregate csv")?;
        info!("saved {}", path.display());
        summary.artifacts.push(path);
    }

    for describe in &config.describes {
        print_describe(&table, describe);
    }
    if config.correlation {
        let mut columns = config.numeric_columns.clone();
        for derivation in &config.derivations {
            let output = derivation.output().to_string();
            if !columns.contains(&output) {
                columns.push(output);
            }
        }
        let matrix = correlation_matrix(&table, &columns);
        println!(">>>>>>>> {} | correlation <<<<<<<<", config.name);
        println!("{}", matrix);
    }

    // expand chart families into independent render jobs
    let mut jobs: Vec<(ChartSpec, Option<&MetricSpec>)> = Vec::new();
    for chart in &config.charts {
        match chart {
            ChartSpec::GroupedBar { .. } | ChartSpec::StackedBar { .. } => {
                jobs.push((chart.clone(), None));
            }
            _ => {
                for metric in &metrics {
                    jobs.push((chart.clone(), Some(*metric)));
                }
            }
        }
    }

    // renders are independent; a failed one is reported and the rest proceed
    let results: Vec<(String, Result<Option<PathBuf>, Report>)> = jobs
        .par_iter()
        .map(|(chart, metric)| {
            let name = job_name(chart, *metric);
            let result = render(config, &table, &views, chart, *metric, &palette);
            (name, result)
        })
        .collect();
    for (name, result) in results {
        match result {
            Ok(Some(path)) => summary.artifacts.push(path),
            Ok(None) => {
                warn!(chart = %name, "no data to plot; skipped");
                summary.skipped_charts.push(name);
            }
            Err(error) => {
                warn!(chart = %name, %error, "render failed; continuing");
                summary.skipped_charts.push(name);
            }
        }
    }

    info!(
        report = %config.name,
        artifacts = summary.artifacts.len(),
        skipped = summary.skipped_charts.len(),
        "report done"
    );
    Ok(summary)
}

fn job_name(chart: &ChartSpec, metric: Option<&MetricSpec>) -> String {
    let kind = match chart {
        ChartSpec::Box { .. } => "box",
        ChartSpec::Histogram { .. } => "histogram",
        ChartSpec::MedianLine => "median_line",
        ChartSpec::Scatter { .. } => "scatter",
        ChartSpec::GroupedBar { .. } => "grouped_bar",
        ChartSpec::StackedBar { .. } => "stacked_bar",
    };
    match metric {
        Some(metric) => format!("{}:{}", kind, metric.column),
        None => kind.to_string(),
    }
}

/// Row indices per level of `column`. Levels declared in `order` come first;
/// levels the data adds on top follow in first-seen order.
fn group_rows(
    table: &MetricTable,
    column: &str,
    order: &[String],
) -> Vec<(String, Vec<usize>)> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut levels: Vec<String> = Vec::new();
    for (row, label) in table.labels(column).into_iter().enumerate() {
        let label = match label {
            Some(label) => label,
            None => continue,
        };
        if !groups.contains_key(&label) {
            levels.push(label.clone());
        }
        groups.entry(label).or_default().push(row);
    }

    let mut ordered: Vec<(String, Vec<usize>)> = order
        .iter()
        .map(|level| (level.clone(), groups.remove(level).unwrap_or_default()))
        .collect();
    for level in levels {
        if let Some(rows) = groups.remove(&level) {
            ordered.push((level, rows));
        }
    }
    ordered
}

fn values_at(table: &MetricTable, rows: &[usize], column: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| table.get(*row, column).as_f64())
        .collect()
}

fn render(
    config: &ReportConfig,
    table: &MetricTable,
    views: &HashMap<String, MetricTable>,
    chart: &ChartSpec,
    metric: Option<&MetricSpec>,
    palette: &Palette,
) -> Result<Option<PathBuf>, Report> {
    let factor = &config.factor;
    match chart {
        ChartSpec::Box { horizontal } => {
            let metric = metric.expect("box charts are per metric");
            let view = &views[&metric.column];
            if view.is_empty() {
                return Ok(None);
            }
            let groups: Vec<(String, Vec<f64>)> =
                group_rows(view, &factor.column, &factor.order)
                    .into_iter()
                    .map(|(level, rows)| {
                        let values = values_at(view, &rows, &metric.column);
                        (level, values)
                    })
                    .collect();
            let suffix = if *horizontal { "hboxplot" } else { "boxplot" };
            let path = PlotFmt::chart_path(&config.output_dir, &metric.column, suffix);
            plot::box_plot(
                &path,
                &format!("{} by {}", metric.display_label(), factor.column),
                &factor.column,
                metric.display_label(),
                &groups,
                *horizontal,
                palette,
            )?;
            Ok(path.exists().then_some(path))
        }
        ChartSpec::Histogram { bins, hue } => {
            let metric = metric.expect("histograms are per metric");
            let view = &views[&metric.column];
            if view.is_empty() {
                return Ok(None);
            }
            let hue = hue.as_deref().unwrap_or(&factor.column);
            let order = if hue == factor.column.as_str() {
                factor.order.clone()
            } else {
                vec![]
            };
            let groups: Vec<(String, Vec<f64>)> = group_rows(view, hue, &order)
                .into_iter()
                .map(|(level, rows)| (level, values_at(view, &rows, &metric.column)))
                .filter(|(_, values)| !values.is_empty())
                .collect();
            let path =
                PlotFmt::chart_path(&config.output_dir, &metric.column, "histogram");
            plot::histogram(
                &path,
                &format!("{} distribution", metric.display_label()),
                metric.display_label(),
                &groups,
                *bins,
                palette,
            )?;
            Ok(path.exists().then_some(path))
        }
        ChartSpec::MedianLine => {
            let metric = metric.expect("median lines are per metric");
            let view = &views[&metric.column];
            let points: Vec<(String, f64)> =
                group_rows(view, &factor.column, &factor.order)
                    .into_iter()
                    .filter_map(|(level, rows)| {
                        let sample =
                            crate::stats::Sample::from(values_at(view, &rows, &metric.column));
                        sample.median().map(|median| (level, median))
                    })
                    .collect();
            if points.is_empty() {
                return Ok(None);
            }
            let path =
                PlotFmt::chart_path(&config.output_dir, &metric.column, "median_line");
            plot::median_line(
                &path,
                &format!("Median {} vs {}", metric.display_label(), factor.column),
                &factor.column,
                metric.display_label(),
                &points,
                palette,
            )?;
            Ok(path.exists().then_some(path))
        }
        ChartSpec::Scatter { x, hue } => {
            let metric = metric.expect("scatters are per metric");
            // the x metric against itself says nothing
            if &metric.column == x {
                return Ok(None);
            }
            if !table.has_column(x) {
                return Ok(None);
            }
            let view = &views[&metric.column];
            if view.is_empty() {
                return Ok(None);
            }
            let hue = hue.as_deref().unwrap_or(&factor.column);
            let order = if hue == factor.column.as_str() {
                factor.order.clone()
            } else {
                vec![]
            };
            let groups: Vec<(String, Vec<(f64, f64)>)> = group_rows(view, hue, &order)
                .into_iter()
                .map(|(level, rows)| {
                    let points: Vec<(f64, f64)> = rows
                        .iter()
                        .filter_map(|row| {
                            let x = view.get(*row, x).as_f64()?;
                            let y = view.get(*row, &metric.column).as_f64()?;
                            Some((x, y))
                        })
                        .collect();
                    (level, points)
                })
                .filter(|(_, points)| !points.is_empty())
                .collect();
            if groups.is_empty() {
                return Ok(None);
            }
            let suffix = format!("vs_{}_scatter", PlotFmt::safe_name(x));
            let path = PlotFmt::chart_path(&config.output_dir, &metric.column, &suffix);
            plot::scatter(
                &path,
                &format!("{} vs {}", x, metric.display_label()),
                x,
                metric.display_label(),
                &groups,
                palette,
            )?;
            Ok(path.exists().then_some(path))
        }
        ChartSpec::GroupedBar {
            value,
            series,
            statistic,
        } => {
            if !table.has_column(value) || !table.has_column(series) {
                return Ok(None);
            }
            let categories: Vec<(String, Vec<usize>)> =
                group_rows(table, &factor.column, &factor.order);
            let category_names: Vec<String> =
                categories.iter().map(|(level, _)| level.clone()).collect();
            // series levels in first-seen order across the whole table
            let series_levels: Vec<String> = group_rows(table, series, &[])
                .into_iter()
                .map(|(level, _)| level)
                .collect();
            let bars: Vec<(String, Vec<Option<f64>>)> = series_levels
                .iter()
                .map(|level| {
                    let heights: Vec<Option<f64>> = categories
                        .iter()
                        .map(|(_, rows)| {
                            let rows: Vec<usize> = rows
                                .iter()
                                .copied()
                                .filter(|row| {
                                    table
                                        .get(*row, series)
                                        .label()
                                        .map(|label| &label == level)
                                        .unwrap_or(false)
                                })
                                .collect();
                            crate::stats::Sample::from(values_at(table, &rows, value))
                                .statistic(*statistic)
                        })
                        .collect();
                    (level.clone(), heights)
                })
                .collect();
            let suffix = format!("{}_grouped_bar", statistic.name());
            let path = PlotFmt::chart_path(&config.output_dir, value, &suffix);
            plot::grouped_bar(
                &path,
                &format!("{} {} by {}", statistic.name(), value, factor.column),
                value,
                &category_names,
                &bars,
                palette,
            )?;
            Ok(if path.exists() { Some(path) } else { None })
        }
        ChartSpec::StackedBar { columns } => {
            let present: Vec<&String> = columns
                .iter()
                .filter(|column| table.has_column(column))
                .collect();
            if present.is_empty() {
                return Ok(None);
            }
            let categories: Vec<(String, Vec<usize>)> =
                group_rows(table, &factor.column, &factor.order);
            let category_names: Vec<String> =
                categories.iter().map(|(level, _)| level.clone()).collect();
            let segments: Vec<(String, Vec<Option<f64>>)> = present
                .iter()
                .map(|column| {
                    let sums: Vec<Option<f64>> = categories
                        .iter()
                        .map(|(_, rows)| {
                            let sample = crate::stats::Sample::from(values_at(
                                table, rows, column,
                            ));
                            sample.statistic(Statistic::Sum)
                        })
                        .collect();
                    ((*column).clone(), sums)
                })
                .collect();
            let name = present
                .iter()
                .map(|column| PlotFmt::safe_name(column))
                .collect::<Vec<_>>()
                .join("_");
            let path = PlotFmt::chart_path(&config.output_dir, &name, "stacked_bar");
            plot::stacked_bar(
                &path,
                &format!("Total by {}", factor.column),
                "Count",
                &category_names,
                &segments,
                palette,
            )?;
            Ok(if path.exists() { Some(path) } else { None })
        }
    }
}

fn print_describe(table: &MetricTable, spec: &DescribeSpec) {
    let (view, _) = metric_view(table, &spec.filter_metric, Some(&spec.filter));
    println!(
        "=== {} ({} rows) ===",
        spec.label,
        view.len()
    );
    let block = pipeline::describe(&view, &spec.columns);
    println!("{}", block);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FactorSpec;
    use crate::db::InputSpec;
    use crate::pipeline::Cap;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn base_config(dir: &tempfile::TempDir, input: &PathBuf) -> ReportConfig {
        let mut config = ReportConfig::new(
            "test",
            dir.path().join("plots"),
            FactorSpec::new("Retries", &["0", "5"]),
        );
        config.inputs.push(InputSpec::new(input.display().to_string()));
        config.numeric_columns.extend([
            "SwitchTime".to_string(),
            "MeanLatency(ms)".to_string(),
        ]);
        config.print_summary = false;
        config
    }

    #[test]
    fn end_to_end_box_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(
            &dir,
            "summary.csv",
            "Retries,SwitchTime,MeanLatency(ms)\n\
             0,23.1,120\n0,24.2,130\n0,25.0,125\n\
             5,20.1,100\n5,21.5,90\n5,900.0,95\n\
             9,19.0,80\n",
        );
        let mut config = base_config(&dir, &input);
        config
            .metrics
            .push(MetricSpec::new("SwitchTime").cap(Cap::at_most(50.0)));
        config.metrics.push(MetricSpec::new("MeanLatency(ms)"));
        config.charts.push(ChartSpec::Box { horizontal: false });
        config.aggregate_csv = Some(PathBuf::from("summary_agg.csv"));

        let summary = generate(&config).unwrap();

        // the Retries=9 row is outside the allow-list
        assert_eq!(summary.rows_outside_factor, 1);
        // the 900.0 switch time is capped out of that metric's view only
        assert_eq!(summary.rows_capped["SwitchTime"], 1);
        assert_eq!(summary.rows_capped["MeanLatency(ms)"], 0);

        let agg = dir.path().join("plots").join("summary_agg.csv");
        assert!(agg.exists());
        let agg = std::fs::read_to_string(agg).unwrap();
        assert!(agg.contains("SwitchTime_count"));
        assert!(agg.contains("MeanLatency(ms)_mean"));

        let boxplot = dir.path().join("plots").join("SwitchTime_boxplot.svg");
        assert!(summary.artifacts.contains(&boxplot));
        assert!(boxplot.exists());
    }

    #[test]
    fn absent_metric_skips_chart_but_not_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(&dir, "summary.csv", "Retries,SwitchTime\n0,20\n5,25\n");
        let mut config = base_config(&dir, &input);
        config.metrics.push(MetricSpec::new("SwitchTime"));
        config.metrics.push(MetricSpec::new("FullRecoveryTime"));
        config.charts.push(ChartSpec::Box { horizontal: false });

        let summary = generate(&config).unwrap();
        assert!(summary
            .skipped_charts
            .iter()
            .any(|name| name.contains("FullRecoveryTime")));
        assert!(dir
            .path()
            .join("plots")
            .join("SwitchTime_boxplot.svg")
            .exists());
        assert!(!dir
            .path()
            .join("plots")
            .join("FullRecoveryTime_boxplot.svg")
            .exists());
    }

    #[test]
    fn header_only_input_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(&dir, "empty.csv", "Retries,SwitchTime\n");
        let mut config = base_config(&dir, &input);
        config.metrics.push(MetricSpec::new("SwitchTime"));
        config.charts.push(ChartSpec::Box { horizontal: false });

        let summary = generate(&config).unwrap();
        assert!(summary.artifacts.is_empty());
    }

    #[test]
    fn status_fraction_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_file(
            &dir,
            "retries.csv",
            "Retries,StatusCodes\n0,200:1780 503:20\n5,200:3590 503:10\n",
        );
        let mut config = base_config(&dir, &input);
        config.inputs[0] = InputSpec::new(input.display().to_string())
            .tag_num("TotalRequests", 1800.0);
        config.derivations.push(crate::pipeline::Derivation::StatusFraction {
            source: "StatusCodes".to_string(),
            code: 200,
            total: Some("TotalRequests".to_string()),
            output: "Status_200".to_string(),
        });
        config.metrics.push(MetricSpec::new("Status_200"));
        config.charts.push(ChartSpec::Box { horizontal: false });

        let summary = generate(&config).unwrap();
        assert!(summary
            .artifacts
            .iter()
            .any(|path| path.ends_with("Status_200_boxplot.svg")));
    }
}
