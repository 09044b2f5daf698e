use std::path::{Path, PathBuf};

pub struct PlotFmt;

impl PlotFmt {
    /// Turns a metric name into something safe for a filename:
    /// `P95(ms)` -> `P95ms`, `SuccessRatio(%)` -> `SuccessRatiopct`,
    /// `bytes/s in` -> `bytes_s_in`.
    pub fn safe_name(metric: &str) -> String {
        metric
            .replace('%', "pct")
            .replace(['(', ')'], "")
            .replace(['/', ' '], "_")
    }

    /// Deterministic artifact path for a (metric, chart kind) pair.
    pub fn chart_path(output_dir: &Path, metric: &str, chart: &str) -> PathBuf {
        output_dir.join(format!("{}_{}.svg", Self::safe_name(metric), chart))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_names() {
        assert_eq!(PlotFmt::safe_name("P95(ms)"), "P95ms");
        assert_eq!(PlotFmt::safe_name("SuccessRatio(%)"), "SuccessRatiopct");
        assert_eq!(PlotFmt::safe_name("Delay(s)"), "Delays");
        assert_eq!(PlotFmt::safe_name("bytes/s in"), "bytes_s_in");
        assert_eq!(PlotFmt::safe_name("SwitchTime"), "SwitchTime");
    }

    #[test]
    fn chart_paths() {
        let path = PlotFmt::chart_path(Path::new("plots"), "MeanLatency(ms)", "boxplot");
        assert_eq!(path, PathBuf::from("plots/MeanLatencyms_boxplot.svg"));
    }
}
