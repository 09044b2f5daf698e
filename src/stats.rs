use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptive statistics a summary can request per metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Count,
    Mean,
    Median,
    StdDev,
    Min,
    Max,
    Sum,
}

impl Statistic {
    pub const ALL: [Statistic; 7] = [
        Statistic::Count,
        Statistic::Mean,
        Statistic::Median,
        Statistic::StdDev,
        Statistic::Min,
        Statistic::Max,
        Statistic::Sum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Count => "count",
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::StdDev => "std",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Sum => "sum",
        }
    }
}

impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A collection of non-missing metric values.
///
/// All statistics are computed over the values actually pushed; callers are
/// expected to drop missing cells before building a `Sample`.
#[derive(Debug, Default, Clone)]
pub struct Sample {
    values: Vec<f64>,
}

impl Sample {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from<T: IntoIterator<Item = f64>>(values: T) -> Self {
        let mut sample = Self::new();
        values.into_iter().for_each(|value| sample.push(value));
        sample
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.sum() / self.count() as f64)
        }
    }

    /// Corrected sample standard deviation (divides by `count - 1`).
    pub fn stddev(&self) -> Option<f64> {
        let count = self.count();
        if count < 2 {
            return None;
        }
        let mean = self.mean()?;
        let sum = self
            .values
            .iter()
            .map(|value| {
                let diff = mean - value;
                diff * diff
            })
            .sum::<f64>();
        Some((sum / (count - 1) as f64).sqrt())
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    pub fn median(&self) -> Option<f64> {
        self.percentile(0.5)
    }

    /// Computes a given percentile over the sorted values.
    ///
    /// When `percentile * count` lands exactly between two values, the
    /// midpoint of the two is returned.
    pub fn percentile(&self, percentile: f64) -> Option<f64> {
        assert!((0.0..=1.0).contains(&percentile));

        if self.values.is_empty() {
            return None;
        }

        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("sample values should be comparable"));

        let count = sorted.len() as f64;
        let index = percentile * count;
        let index_rounded = index.round();
        // check if index is a whole number
        let is_whole_number = (index - index_rounded).abs() == 0.0;

        let value = if is_whole_number {
            let right = index_rounded as usize;
            if right == 0 {
                sorted[0]
            } else if right >= sorted.len() {
                sorted[sorted.len() - 1]
            } else {
                (sorted[right - 1] + sorted[right]) / 2.0
            }
        } else {
            let left = (index.ceil() as usize).clamp(1, sorted.len()) - 1;
            sorted[left]
        };
        Some(value)
    }

    pub fn statistic(&self, statistic: Statistic) -> Option<f64> {
        match statistic {
            Statistic::Count => Some(self.count() as f64),
            Statistic::Mean => self.mean(),
            Statistic::Median => self.median(),
            Statistic::StdDev => self.stddev(),
            Statistic::Min => self.min(),
            Statistic::Max => self.max(),
            Statistic::Sum => {
                if self.is_empty() {
                    None
                } else {
                    Some(self.sum())
                }
            }
        }
    }
}

/// Pearson correlation between two paired samples; `None` when fewer than two
/// pairs remain or either side has zero variance.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let count = pairs.len();
    if count < 2 {
        return None;
    }
    let n = count as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats() {
        let sample = Sample::from(vec![10.0, 20.0, 30.0]);
        assert_eq!(sample.mean(), Some(20.0));
        assert_eq!(sample.min(), Some(10.0));
        assert_eq!(sample.max(), Some(30.0));
        assert_eq!(sample.sum(), 60.0);
        assert_eq!(sample.stddev(), Some(10.0));

        let empty = Sample::new();
        assert_eq!(empty.mean(), None);
        assert_eq!(empty.stddev(), None);
        assert_eq!(empty.statistic(Statistic::Count), Some(0.0));
        assert_eq!(empty.statistic(Statistic::Sum), None);
    }

    #[test]
    fn percentile() {
        let data = vec![
            43.0, 54.0, 56.0, 61.0, 62.0, 66.0, 68.0, 69.0, 69.0, 70.0, 71.0,
            72.0, 77.0, 78.0, 79.0, 85.0, 87.0, 88.0, 89.0, 93.0, 95.0, 96.0,
            98.0, 99.0, 99.0,
        ];
        let sample = Sample::from(data);

        assert_eq!(sample.min(), Some(43.0));
        assert_eq!(sample.max(), Some(99.0));
        assert_eq!(sample.percentile(0.9), Some(98.0));
        assert_eq!(sample.percentile(0.5), Some(77.0));
        assert_eq!(sample.percentile(0.2), Some(64.0));
    }

    #[test]
    fn percentile_bounds() {
        let sample = Sample::from(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(sample.percentile(0.0), Some(1.0));
        assert_eq!(sample.percentile(1.0), Some(4.0));
        // 0.5 * 4 = 2 is whole: midpoint of the 2nd and 3rd values
        assert_eq!(sample.median(), Some(2.5));
    }

    #[test]
    fn correlation() {
        let pairs: Vec<_> = (0..10).map(|i| (i as f64, 2.0 * i as f64)).collect();
        let r = pearson(&pairs).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let anti: Vec<_> = (0..10).map(|i| (i as f64, -(i as f64))).collect();
        let r = pearson(&anti).unwrap();
        assert!((r + 1.0).abs() < 1e-12);

        // zero variance on one side
        let flat: Vec<_> = (0..10).map(|i| (i as f64, 7.0)).collect();
        assert_eq!(pearson(&flat), None);
    }
}
