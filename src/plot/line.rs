use crate::draw;
use crate::plot::style::{Palette, FONT, HEIGHT, LABEL_SIZE, TITLE_SIZE, WIDTH};
use crate::plot::{min_max, padded_range};
use color_eyre::Report;
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

/// A per-group statistic (typically the median) against the ordered factor
/// levels, drawn as a marked line.
pub fn median_line(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    points: &[(String, f64)],
    palette: &Palette,
) -> Result<(), Report> {
    let (y_min, y_max) = match min_max(points.iter().map(|(_, value)| *value)) {
        Some(bounds) => bounds,
        None => return Ok(()),
    };
    let labels: Vec<String> = points.iter().map(|(label, _)| label.clone()).collect();
    let x_range = -0.5..(points.len() as f64 - 0.5);

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    draw!(root.fill(&WHITE));
    let mut chart = draw!(ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, padded_range(y_min, y_max)));
    let axis_labels = labels.clone();
    draw!(chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_labels(points.len())
        .x_label_formatter(&|x| level_label(*x, &axis_labels))
        .label_style((FONT, LABEL_SIZE))
        .draw());

    let color = palette.color(0);
    draw!(chart.draw_series(LineSeries::new(
        points
            .iter()
            .enumerate()
            .map(|(index, (_, value))| (index as f64, *value)),
        color.stroke_width(2),
    )));
    draw!(chart.draw_series(points.iter().enumerate().map(|(index, (_, value))| {
        Circle::new((index as f64, *value), 4, color.filled())
    })));

    draw!(root.present());
    info!("saved {}", path.display());
    Ok(())
}

/// Maps a tick position back to its factor level; off-center ticks get no
/// label.
fn level_label(x: f64, labels: &[String]) -> String {
    let index = x.round();
    if (x - index).abs() > 0.25 || index < 0.0 {
        return String::new();
    }
    labels.get(index as usize).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draws_ordered_levels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("median_line.svg");
        let points = vec![
            ("0".to_string(), 210.0),
            ("2".to_string(), 180.0),
            ("5".to_string(), 150.0),
            ("7".to_string(), 149.0),
        ];
        median_line(
            &path,
            "Median MeanLatency(ms) vs Retries",
            "Retries",
            "MeanLatency(ms)",
            &points,
            &Palette::default(),
        )
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn tick_labels() {
        let labels: Vec<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        assert_eq!(level_label(0.0, &labels), "a");
        assert_eq!(level_label(1.1, &labels), "b");
        assert_eq!(level_label(0.5, &labels), "");
        assert_eq!(level_label(-1.0, &labels), "");
    }
}
