use crate::draw;
use crate::plot::style::{Palette, FONT, HEIGHT, LABEL_SIZE, TITLE_SIZE, WIDTH};
use crate::plot::{min_max, padded_range};
use color_eyre::Report;
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

/// One box per group, in the given group order. Groups with no values keep
/// their axis slot but draw nothing.
#[allow(clippy::too_many_arguments)]
pub fn box_plot(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    groups: &[(String, Vec<f64>)],
    horizontal: bool,
    palette: &Palette,
) -> Result<(), Report> {
    let (min, max) = match min_max(groups.iter().flat_map(|(_, values)| values.iter().copied()))
    {
        Some(bounds) => bounds,
        None => return Ok(()),
    };
    // the boxplot element draws on an f32 value axis
    let value_range = padded_range(min, max);
    let value_range = value_range.start as f32..value_range.end as f32;
    let labels: Vec<String> = groups.iter().map(|(label, _)| label.clone()).collect();

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    draw!(root.fill(&WHITE));

    if horizontal {
        let mut chart = draw!(ChartBuilder::on(&root)
            .caption(title, (FONT, TITLE_SIZE))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d(value_range, (0..groups.len()).into_segmented()));
        let axis_labels = labels.clone();
        draw!(chart
            .configure_mesh()
            .x_desc(y_label)
            .y_desc(x_label)
            .label_style((FONT, LABEL_SIZE))
            .y_label_formatter(&|segment| segment_label(segment, &axis_labels))
            .draw());
        for (index, (_, values)) in groups.iter().enumerate() {
            if values.is_empty() {
                continue;
            }
            let quartiles = Quartiles::new(values);
            draw!(chart.draw_series(std::iter::once(
                Boxplot::new_horizontal(SegmentValue::CenterOf(index), &quartiles)
                    .width(25)
                    .style(palette.color(index)),
            )));
        }
    } else {
        let mut chart = draw!(ChartBuilder::on(&root)
            .caption(title, (FONT, TITLE_SIZE))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(70)
            .build_cartesian_2d((0..groups.len()).into_segmented(), value_range));
        let axis_labels = labels.clone();
        draw!(chart
            .configure_mesh()
            .x_desc(x_label)
            .y_desc(y_label)
            .label_style((FONT, LABEL_SIZE))
            .x_label_formatter(&|segment| segment_label(segment, &axis_labels))
            .draw());
        for (index, (_, values)) in groups.iter().enumerate() {
            if values.is_empty() {
                continue;
            }
            let quartiles = Quartiles::new(values);
            draw!(chart.draw_series(std::iter::once(
                Boxplot::new_vertical(SegmentValue::CenterOf(index), &quartiles)
                    .width(25)
                    .style(palette.color(index)),
            )));
        }
    }

    draw!(root.present());
    info!("saved {}", path.display());
    Ok(())
}

fn segment_label(segment: &SegmentValue<usize>, labels: &[String]) -> String {
    match segment {
        SegmentValue::CenterOf(index) => {
            labels.get(*index).cloned().unwrap_or_default()
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_five_declared_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switch_time_boxplot.svg");
        let groups: Vec<(String, Vec<f64>)> = ["1s", "3s", "5s", "7s", "10s"]
            .iter()
            .enumerate()
            .map(|(i, label)| {
                (
                    label.to_string(),
                    vec![i as f64 + 1.0, i as f64 + 2.0, i as f64 + 3.0],
                )
            })
            .collect();
        box_plot(
            &path,
            "Failover Switch Time vs Probe Period",
            "Probe Period (s)",
            "Switch Time (s)",
            &groups,
            false,
            &Palette::default(),
        )
        .unwrap();

        let svg = std::fs::read_to_string(&path).unwrap();
        for label in ["1s", "3s", "5s", "7s", "10s"] {
            assert!(svg.contains(label), "missing axis label {}", label);
        }
    }

    #[test]
    fn no_values_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty_boxplot.svg");
        let groups = vec![("1s".to_string(), Vec::new())];
        box_plot(
            &path,
            "empty",
            "x",
            "y",
            &groups,
            false,
            &Palette::default(),
        )
        .unwrap();
        assert!(!path.exists());
    }
}
