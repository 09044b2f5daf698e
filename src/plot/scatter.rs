use crate::draw;
use crate::plot::style::{Palette, FONT, HEIGHT, LABEL_SIZE, TITLE_SIZE, WIDTH};
use crate::plot::{min_max, padded_range};
use color_eyre::Report;
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

/// One point per row, colored per hue group.
pub fn scatter(
    path: &Path,
    title: &str,
    x_label: &str,
    y_label: &str,
    groups: &[(String, Vec<(f64, f64)>)],
    palette: &Palette,
) -> Result<(), Report> {
    let (x_min, x_max) =
        match min_max(groups.iter().flat_map(|(_, points)| points.iter().map(|(x, _)| *x))) {
            Some(bounds) => bounds,
            None => return Ok(()),
        };
    let (y_min, y_max) =
        match min_max(groups.iter().flat_map(|(_, points)| points.iter().map(|(_, y)| *y))) {
            Some(bounds) => bounds,
            None => return Ok(()),
        };

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    draw!(root.fill(&WHITE));
    let mut chart = draw!(ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d(padded_range(x_min, x_max), padded_range(y_min, y_max)));
    draw!(chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .label_style((FONT, LABEL_SIZE))
        .draw());

    let multi = groups.len() > 1;
    for (index, (label, points)) in groups.iter().enumerate() {
        let color = palette.color(index);
        let series = draw!(chart.draw_series(
            points
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 3, color.filled())),
        ));
        if multi {
            series.label(label.clone()).legend(move |(x, y)| {
                Circle::new((x + 5, y), 4, color.filled())
            });
        }
    }
    if multi {
        draw!(chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font((FONT, LABEL_SIZE))
            .draw());
    }

    draw!(root.present());
    info!("saved {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_hue_groups() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scatter.svg");
        let groups = vec![
            (
                "10 req/sec".to_string(),
                vec![(21.0, 110.0), (24.0, 130.0)],
            ),
            (
                "60 req/sec".to_string(),
                vec![(26.0, 150.0), (29.0, 180.0)],
            ),
        ];
        scatter(
            &path,
            "SwitchTime vs MeanLatency(ms)",
            "SwitchTime",
            "MeanLatency(ms)",
            &groups,
            &Palette::default(),
        )
        .unwrap();
        assert!(path.exists());
    }

    #[test]
    fn empty_groups_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scatter_empty.svg");
        scatter(&path, "t", "x", "y", &[], &Palette::default()).unwrap();
        assert!(!path.exists());
    }
}
