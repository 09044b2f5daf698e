use benchplot::{
    Cap, ChartSpec, Derivation, DescribeSpec, FactorSpec, FilenameRule,
    InputSpec, MetricSpec, ReportConfig, Statistic,
};
use color_eyre::Report;
use std::path::Path;
use tracing::warn;

fn main() -> Result<(), Report> {
    tracing_subscriber::fmt::init();

    // a single argument points at an externalized report; with no argument
    // the built-in suite runs
    let args: Vec<String> = std::env::args().collect();
    if let Some(path) = args.get(1) {
        let config = ReportConfig::from_file(Path::new(path))?;
        benchplot::generate(&config)?;
        return Ok(());
    }

    let reports = [
        failover_probe_period(),
        retry_count_effect(),
        error_rate_effect(),
        retry_toggle(),
        timeout_sweep(),
        switchtime_variation(),
        scenario_comparison(),
    ];
    for config in reports {
        println!(">>>>>>>> {} <<<<<<<<", config.name.to_uppercase());
        // one report with no readable inputs must not stop the others
        if let Err(error) = benchplot::generate(&config) {
            warn!(report = %config.name, %error, "report failed; continuing");
        }
    }
    Ok(())
}

/// Switch time and mean latency against the failover probe period, one
/// summary file per period.
fn failover_probe_period() -> ReportConfig {
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
    config.numeric_columns = columns(&["SwitchTime", "MeanLatency(ms)"]);
    config.metrics = vec![
        MetricSpec::new("SwitchTime")
            .label("Switch Time (s)")
            .cap(Cap::at_most(50.0)),
        MetricSpec::new("MeanLatency(ms)")
            .label("Mean Latency (ms)")
            .cap(Cap::at_most(750.0)),
    ];
    config.charts = vec![ChartSpec::Box { horizontal: false }];
    config
}

/// Effect of the retry budget at a fixed 50% injected error rate. Each file
/// carries one retry setting; the status-code string is normalized against
/// the per-file request volume.
fn retry_count_effect() -> ReportConfig {
    let mut config = ReportConfig::new(
        "retry count effect",
        "retry_count_plots",
        FactorSpec::new("RetryCount", &["0", "2", "5", "7"]),
    );
    let files = [
        ("retries_summary_disabled.csv", 0.0, 1800.0),
        ("retries_summary_2_retries.csv", 2.0, 1800.0),
        ("retries_summary_enabled.csv", 5.0, 3600.0),
        ("retries_summary_7_retries.csv", 7.0, 1800.0),
    ];
    for (file, retries, total_requests) in files {
        config.inputs.push(
            InputSpec::new(file)
                .tag_num("RetryCount", retries)
                .tag_num("TotalRequests", total_requests)
                .limit(50),
        );
    }
    config.numeric_columns = columns(&[
        "SuccessRate",
        "P50Latency(ms)",
        "MeanLatency(ms)",
        "BytesInTotal",
        "BytesInMean",
    ]);
    config.derivations = status_fractions("TotalRequests");
    config.metrics = vec![
        MetricSpec::new("SuccessRate"),
        MetricSpec::new("P50Latency(ms)"),
        MetricSpec::new("MeanLatency(ms)"),
        MetricSpec::new("BytesInTotal"),
        MetricSpec::new("BytesInMean"),
        MetricSpec::new("Status_200").label("Fraction of Requests (200)"),
        MetricSpec::new("Status_503").label("Fraction of Requests (503)"),
    ];
    config.charts = vec![
        ChartSpec::Box { horizontal: false },
        ChartSpec::MedianLine,
    ];
    config.aggregate_csv = Some("retry_summary_agg.csv".into());
    config
}

/// Effect of the injected error rate at a fixed retry budget of 5.
fn error_rate_effect() -> ReportConfig {
    let mut config = ReportConfig::new(
        "error rate effect",
        "error_rate_plots",
        FactorSpec::new("ErrorRate", &["25", "50", "75"]),
    );
    let files = [
        ("retries_summary_25err_updated.csv", 25.0, 1800.0),
        ("retries_summary_enabled.csv", 50.0, 3600.0),
        ("retries_summary_75err_updated.csv", 75.0, 1800.0),
    ];
    for (file, error_rate, total_requests) in files {
        config.inputs.push(
            InputSpec::new(file)
                .tag_num("ErrorRate", error_rate)
                .tag_num("TotalRequests", total_requests)
                .limit(50),
        );
    }
    config.numeric_columns = columns(&[
        "SuccessRate",
        "P50Latency(ms)",
        "MeanLatency(ms)",
        "BytesInTotal",
        "BytesInMean",
    ]);
    config.derivations = status_fractions("TotalRequests");
    config.metrics = vec![
        MetricSpec::new("SuccessRate"),
        MetricSpec::new("P50Latency(ms)"),
        MetricSpec::new("MeanLatency(ms)"),
        MetricSpec::new("BytesInTotal"),
        MetricSpec::new("BytesInMean"),
        MetricSpec::new("Status_200").label("Fraction of Requests (200)"),
        MetricSpec::new("Status_503").label("Fraction of Requests (503)"),
    ];
    config.charts = vec![
        ChartSpec::Box { horizontal: false },
        ChartSpec::MedianLine,
    ];
    config
}

/// Retries enabled vs disabled: horizontal boxes per metric plus the total
/// status-code counts stacked per setting.
fn retry_toggle() -> ReportConfig {
    let mut config = ReportConfig::new(
        "retry toggle",
        "retry_toggle_plots",
        FactorSpec::new("Retries", &["Enabled", "Disabled"]),
    );
    config.inputs.push(
        InputSpec::new("retries_summary_enabled.csv").tag_str("Retries", "Enabled"),
    );
    config.inputs.push(
        InputSpec::new("retries_summary_disabled.csv").tag_str("Retries", "Disabled"),
    );
    config.numeric_columns = columns(&[
        "SuccessRate",
        "P50Latency(ms)",
        "MeanLatency(ms)",
        "BytesInTotal",
        "BytesInMean",
    ]);
    // raw counts here, not fractions: the stacked bar shows totals
    config.derivations = vec![
        Derivation::StatusFraction {
            source: "StatusCodes".to_string(),
            code: 200,
            total: None,
            output: "Status_200".to_string(),
        },
        Derivation::StatusFraction {
            source: "StatusCodes".to_string(),
            code: 503,
            total: None,
            output: "Status_503".to_string(),
        },
    ];
    config.metrics = vec![
        MetricSpec::new("SuccessRate"),
        MetricSpec::new("P50Latency(ms)"),
        MetricSpec::new("MeanLatency(ms)"),
        MetricSpec::new("BytesInTotal"),
        MetricSpec::new("BytesInMean"),
    ];
    config.charts = vec![
        ChartSpec::Box { horizontal: true },
        ChartSpec::StackedBar {
            columns: vec!["Status_200".to_string(), "Status_503".to_string()],
        },
    ];
    config
}

/// Timeout sweep: eight timeout metrics against the injected delay, each
/// with its own outlier cap.
fn timeout_sweep() -> ReportConfig {
    let mut config = ReportConfig::new(
        "timeouts",
        "timeout_plots",
        FactorSpec::new("Delay(s)", &["0.2", "0.5", "0.8", "1", "1.2", "1.5"]),
    );
    config.inputs.push(InputSpec::new("timeouts_summary.csv"));
    let caps = [
        ("SuccessRatio(%)", 100.0),
        ("TimeoutHitRate(%)", 100.0),
        ("TimeoutAccuracyMean(ms)", 2000.0),
        ("TimeoutAccuracyP95(ms)", 3000.0),
        ("WastedTimeMean(ms)", 3000.0),
        ("WastedTimeP95(ms)", 5000.0),
        ("P95_200(ms)", 5000.0),
        ("P99_200(ms)", 10000.0),
    ];
    config.numeric_columns = columns(&["Delay(s)", "Timeout(s)", "Rate"]);
    for (metric, upper) in caps {
        config.numeric_columns.push(metric.to_string());
        config
            .metrics
            .push(MetricSpec::new(metric).cap(Cap::between(0.0, upper)));
    }
    config.charts = vec![ChartSpec::Box { horizontal: false }];
    config
}

/// Switch-time variation between request rates: hue histogram, boxes,
/// scatters against the latency metrics, fast/slow subgroup summaries and a
/// correlation matrix.
fn switchtime_variation() -> ReportConfig {
    let mut config = ReportConfig::new(
        "switchtime variation",
        "switchtime_plots",
        FactorSpec::new("Scenario", &["10 req/sec", "60 req/sec"]),
    );
    config.inputs.push(
        InputSpec::new("failover_summary_10req_23_07.csv")
            .tag_str("Scenario", "10 req/sec"),
    );
    config.inputs.push(
        InputSpec::new("failover_summary_60req_23_07.csv")
            .tag_str("Scenario", "60 req/sec"),
    );
    config.numeric_columns = columns(&[
        "SwitchTime",
        "MeanLatency(ms)",
        "P95(ms)",
        "P99(ms)",
        "Status200",
        "Status503",
    ]);
    config.derivations = vec![Derivation::ErrorRate {
        success: "Status200".to_string(),
        error: "Status503".to_string(),
        output: "ErrorRate(%)".to_string(),
        percent: true,
    }];
    config.metrics = vec![
        MetricSpec::new("SwitchTime").label("SwitchTime (seconds)"),
        MetricSpec::new("MeanLatency(ms)"),
        MetricSpec::new("P95(ms)"),
        MetricSpec::new("P99(ms)"),
    ];
    config.charts = vec![
        ChartSpec::Box { horizontal: false },
        ChartSpec::Histogram {
            bins: 12,
            hue: Some("Scenario".to_string()),
        },
        ChartSpec::Scatter {
            x: "SwitchTime".to_string(),
            hue: Some("Scenario".to_string()),
        },
    ];
    let describe_columns = columns(&[
        "MeanLatency(ms)",
        "P95(ms)",
        "P99(ms)",
        "ErrorRate(%)",
    ]);
    config.describes = vec![
        DescribeSpec {
            label: "Fast Failover (<26s)".to_string(),
            filter_metric: "SwitchTime".to_string(),
            filter: Cap::at_most(26.0),
            columns: describe_columns.clone(),
        },
        DescribeSpec {
            label: "Slow Failover (>29s)".to_string(),
            filter_metric: "SwitchTime".to_string(),
            filter: Cap {
                lower: Some(29.0),
                upper: None,
            },
            columns: describe_columns,
        },
    ];
    config.correlation = true;
    config
}

/// Duration x request-rate scenarios: boxes per scenario plus the average
/// error count with and without retries side by side.
fn scenario_comparison() -> ReportConfig {
    let mut config = ReportConfig::new(
        "scenario comparison",
        "scenario_plots",
        FactorSpec::new(
            "Scenario",
            &["1 min 10 req", "1 min 60 req", "3 min 10 req", "3 min 60 req"],
        ),
    );
    let files = [
        ("failover_summary_1min_10req_wo_retries.csv", "1 min 10 req", "Without Retries"),
        ("failover_summary_1min_10req_new.csv", "1 min 10 req", "With Retries"),
        ("failover_summary_1min_60req_wo_retries.csv", "1 min 60 req", "Without Retries"),
        ("failover_summary_1min_60req_new.csv", "1 min 60 req", "With Retries"),
        ("failover_summary_3min_10req.csv", "3 min 10 req", "With Retries"),
        ("failover_summary_3min_60req.csv", "3 min 60 req", "With Retries"),
    ];
    for (file, scenario, retry_mode) in files {
        config.inputs.push(
            InputSpec::new(file)
                .tag_str("Scenario", scenario)
                .tag_str("RetryMode", retry_mode),
        );
    }
    config.numeric_columns = columns(&[
        "SwitchTime",
        "MeanLatency(ms)",
        "P95(ms)",
        "P99(ms)",
        "SuccessCount",
        "ErrorCount",
    ]);
    config.metrics = vec![
        MetricSpec::new("SwitchTime"),
        MetricSpec::new("MeanLatency(ms)"),
        MetricSpec::new("P95(ms)"),
        MetricSpec::new("P99(ms)"),
        MetricSpec::new("SuccessCount"),
        MetricSpec::new("ErrorCount"),
    ];
    config.charts = vec![
        ChartSpec::Box { horizontal: false },
        ChartSpec::GroupedBar {
            value: "ErrorCount".to_string(),
            series: "RetryMode".to_string(),
            statistic: Statistic::Mean,
        },
    ];
    config
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

/// 200/503 fractions out of the compact `StatusCodes` string, normalized by
/// the per-file request volume carried in `total`.
fn status_fractions(total: &str) -> Vec<Derivation> {
    [200u16, 503]
        .into_iter()
        .map(|code| Derivation::StatusFraction {
            source: "StatusCodes".to_string(),
            code,
            total: Some(total.to_string()),
            output: format!("Status_{}", code),
        })
        .collect()
}
