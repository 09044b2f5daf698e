use crate::draw;
use crate::plot::style::{Palette, FONT, HEIGHT, LABEL_SIZE, TITLE_SIZE, WIDTH};
use color_eyre::Report;
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

/// Side-by-side bars: one cluster per category, one bar per series.
/// `series` values are parallel to `categories`; a missing value is a zero
/// height bar.
pub fn grouped_bar(
    path: &Path,
    title: &str,
    y_label: &str,
    categories: &[String],
    series: &[(String, Vec<Option<f64>>)],
    palette: &Palette,
) -> Result<(), Report> {
    let y_max = series
        .iter()
        .flat_map(|(_, values)| values.iter().flatten().copied())
        .fold(0.0f64, f64::max);
    if categories.is_empty() || series.is_empty() || y_max <= 0.0 {
        return Ok(());
    }

    let bar_width = 0.8 / series.len() as f64;
    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    draw!(root.fill(&WHITE));
    let mut chart = draw!(ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(
            -0.5..(categories.len() as f64 - 0.5),
            0.0..y_max * 1.1
        ));
    draw!(chart
        .configure_mesh()
        .y_desc(y_label)
        .x_labels(categories.len())
        .x_label_formatter(&|x| category_label(*x, categories))
        .label_style((FONT, LABEL_SIZE))
        .draw());

    for (index, (label, values)) in series.iter().enumerate() {
        let color = palette.color(index);
        let shift = index as f64 * bar_width - 0.4;
        let annotated = draw!(chart.draw_series(values.iter().enumerate().filter_map(
            |(category, value)| {
                let value = (*value)?;
                let x0 = category as f64 + shift;
                Some(Rectangle::new(
                    [(x0, 0.0), (x0 + bar_width, value)],
                    color.filled(),
                ))
            }
        )));
        annotated.label(label.clone()).legend(move |(x, y)| {
            Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
        });
    }
    draw!(chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_SIZE))
        .draw());

    draw!(root.present());
    info!("saved {}", path.display());
    Ok(())
}

/// One bar per category, the series stacked bottom-up in declaration order.
pub fn stacked_bar(
    path: &Path,
    title: &str,
    y_label: &str,
    categories: &[String],
    series: &[(String, Vec<Option<f64>>)],
    palette: &Palette,
) -> Result<(), Report> {
    // total height per category decides the y-range
    let totals: Vec<f64> = (0..categories.len())
        .map(|category| {
            series
                .iter()
                .filter_map(|(_, values)| values.get(category).copied().flatten())
                .sum()
        })
        .collect();
    let y_max = totals.iter().copied().fold(0.0f64, f64::max);
    if categories.is_empty() || series.is_empty() || y_max <= 0.0 {
        return Ok(());
    }

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    draw!(root.fill(&WHITE));
    let mut chart = draw!(ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(
            -0.5..(categories.len() as f64 - 0.5),
            0.0..y_max * 1.1
        ));
    draw!(chart
        .configure_mesh()
        .y_desc(y_label)
        .x_labels(categories.len())
        .x_label_formatter(&|x| category_label(*x, categories))
        .label_style((FONT, LABEL_SIZE))
        .draw());

    let mut base = vec![0.0f64; categories.len()];
    for (index, (label, values)) in series.iter().enumerate() {
        let color = palette.color(index);
        let segments: Vec<Rectangle<(f64, f64)>> = values
            .iter()
            .enumerate()
            .filter_map(|(category, value)| {
                let value = (*value)?;
                if value <= 0.0 {
                    return None;
                }
                let bottom = base[category];
                base[category] += value;
                Some(Rectangle::new(
                    [
                        (category as f64 - 0.4, bottom),
                        (category as f64 + 0.4, bottom + value),
                    ],
                    color.filled(),
                ))
            })
            .collect();
        let annotated = draw!(chart.draw_series(segments));
        annotated.label(label.clone()).legend(move |(x, y)| {
            Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
        });
    }
    draw!(chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font((FONT, LABEL_SIZE))
        .draw());

    draw!(root.present());
    info!("saved {}", path.display());
    Ok(())
}

fn category_label(x: f64, categories: &[String]) -> String {
    let index = x.round();
    if (x - index).abs() > 0.25 || index < 0.0 {
        return String::new();
    }
    categories.get(index as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn to_strings(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    #[test]
    fn grouped_bars_with_legend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error_count_comparison.svg");
        let categories = to_strings(&["1min_10req", "1min_60req"]);
        let series = vec![
            ("Without Retries".to_string(), vec![Some(42.0), Some(250.0)]),
            ("With Retries".to_string(), vec![Some(7.0), Some(30.0)]),
        ];
        grouped_bar(
            &path,
            "ErrorCount Comparison",
            "Average ErrorCount",
            &categories,
            &series,
            &Palette::default(),
        )
        .unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("Without Retries"));
        assert!(svg.contains("With Retries"));
    }

    #[test]
    fn stacked_bars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status_codes_stacked_bar.svg");
        let categories = to_strings(&["Disabled", "Enabled"]);
        let series = vec![
            ("Status_200".to_string(), vec![Some(1500.0), Some(1780.0)]),
            ("Status_503".to_string(), vec![Some(300.0), Some(20.0)]),
        ];
        stacked_bar(
            &path,
            "Total Status Codes by Retry Setting",
            "Count",
            &categories,
            &series,
            &Palette::default(),
        )
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn all_zero_series_renders_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("zeros.svg");
        let categories = to_strings(&["a"]);
        let series = vec![("s".to_string(), vec![Some(0.0)])];
        grouped_bar(&path, "t", "y", &categories, &series, &Palette::default()).unwrap();
        assert!(!path.exists());
    }
}
