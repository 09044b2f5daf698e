use crate::db::MetricTable;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Keeps only rows whose factor level belongs to a declared ordered set.
/// The declaration order is also the axis order of every grouped chart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorAllowList {
    pub column: String,
    pub order: Vec<String>,
}

impl FactorAllowList {
    pub fn new(column: impl Into<String>, order: &[&str]) -> Self {
        Self {
            column: column.into(),
            order: order.iter().map(|level| level.to_string()).collect(),
        }
    }

    /// Drops rows outside the set; returns how many were removed.
    pub fn apply(&self, table: &mut MetricTable) -> usize {
        if !table.has_column(&self.column) {
            return 0;
        }
        let column = self.column.clone();
        let order = self.order.clone();
        let removed = table.retain_rows(|row| {
            row.get(&column)
                .and_then(|value| value.label())
                .map(|label| order.contains(&label))
                .unwrap_or(false)
        });
        if removed > 0 {
            info!(
                factor = %self.column,
                removed,
                "dropped rows outside the declared factor levels"
            );
        }
        removed
    }
}

/// Inclusive per-metric bounds; either side optional.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Cap {
    #[serde(default)]
    pub lower: Option<f64>,
    #[serde(default)]
    pub upper: Option<f64>,
}

impl Cap {
    pub fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    pub fn at_most(upper: f64) -> Self {
        Self {
            lower: None,
            upper: Some(upper),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        if let Some(lower) = self.lower {
            if value < lower {
                return false;
            }
        }
        if let Some(upper) = self.upper {
            if value > upper {
                return false;
            }
        }
        true
    }
}

/// Rows removed while building one metric's view.
#[derive(Debug, Default, Clone, Copy)]
pub struct ViewStats {
    pub out_of_bounds: usize,
    pub missing: usize,
}

/// The rows usable for one metric's chart: metric value present and inside
/// the cap. The exclusion is local to this view; the source table keeps every
/// row for the other metrics.
pub fn metric_view(
    table: &MetricTable,
    metric: &str,
    cap: Option<&Cap>,
) -> (MetricTable, ViewStats) {
    let mut view = table.clone();
    let mut stats = ViewStats::default();
    let metric = metric.to_string();
    view.retain_rows(|row| {
        match row.get(&metric).and_then(|value| value.as_f64()) {
            Some(value) => {
                let keep = cap.map(|cap| cap.contains(value)).unwrap_or(true);
                if !keep {
                    stats.out_of_bounds += 1;
                }
                keep
            }
            None => {
                stats.missing += 1;
                false
            }
        }
    });
    (view, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Value;
    use quickcheck_macros::quickcheck;
    use std::collections::HashMap;

    fn table_from(rows: &[(&str, Option<f64>)]) -> MetricTable {
        let mut table = MetricTable::new();
        for (id, (factor, value)) in rows.iter().enumerate() {
            let mut row = HashMap::new();
            row.insert("RowId".to_string(), Value::Num(id as f64));
            row.insert("Factor".to_string(), Value::Str(factor.to_string()));
            row.insert(
                "Metric".to_string(),
                value.map(Value::Num).unwrap_or(Value::Missing),
            );
            table.push_row(row);
        }
        table
    }

    #[test]
    fn allow_list_is_set_membership() {
        let mut table = table_from(&[
            ("1s", Some(1.0)),
            ("15s", Some(2.0)),
            ("5s", Some(3.0)),
            ("10s", Some(4.0)),
        ]);
        let allow = FactorAllowList::new("Factor", &["1s", "3s", "5s", "7s", "10s"]);
        let removed = allow.apply(&mut table);
        assert_eq!(removed, 1);
        assert_eq!(table.len(), 3);
        let labels: Vec<_> = table.labels("Factor").into_iter().flatten().collect();
        assert!(!labels.contains(&"15s".to_string()));
    }

    #[test]
    fn caps_are_per_metric() {
        let table = table_from(&[
            ("a", Some(10.0)),
            ("a", Some(100.0)),
            ("a", None),
        ]);
        let cap = Cap::at_most(50.0);
        let (view, stats) = metric_view(&table, "Metric", Some(&cap));
        assert_eq!(view.len(), 1);
        assert_eq!(stats.out_of_bounds, 1);
        assert_eq!(stats.missing, 1);
        // the source table still has every row
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn lower_bound_is_inclusive() {
        let cap = Cap::between(0.0, 100.0);
        assert!(cap.contains(0.0));
        assert!(cap.contains(100.0));
        assert!(!cap.contains(-0.1));
        assert!(!cap.contains(100.1));
    }

    fn surviving_ids(table: &MetricTable) -> Vec<i64> {
        let mut ids: Vec<i64> = table
            .numbers("RowId")
            .into_iter()
            .flatten()
            .map(|id| id as i64)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[quickcheck]
    fn filter_order_independent(rows: Vec<(u8, Option<i16>)>) -> bool {
        let levels = ["1s", "3s", "5s", "15s"];
        let rows: Vec<(&str, Option<f64>)> = rows
            .iter()
            .map(|(factor, value)| {
                (
                    levels[(*factor as usize) % levels.len()],
                    value.map(|v| v as f64 / 10.0),
                )
            })
            .collect();
        let table = table_from(&rows);
        let allow = FactorAllowList::new("Factor", &["1s", "3s", "5s"]);
        let cap = Cap::between(-100.0, 100.0);

        // allow-list first, then the cap
        let mut first = table.clone();
        allow.apply(&mut first);
        let (first, _) = metric_view(&first, "Metric", Some(&cap));

        // cap first, then the allow-list
        let (mut second, _) = metric_view(&table, "Metric", Some(&cap));
        allow.apply(&mut second);

        surviving_ids(&first) == surviving_ids(&second)
    }
}
