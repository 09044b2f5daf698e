use crate::draw;
use crate::plot::style::{Palette, FONT, HEIGHT, LABEL_SIZE, TITLE_SIZE, WIDTH};
use crate::plot::min_max;
use color_eyre::Report;
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

/// Frequency histogram over equal-width bins. With more than one group the
/// bars overlay semi-transparently, one color per group, with a legend.
pub fn histogram(
    path: &Path,
    title: &str,
    x_label: &str,
    groups: &[(String, Vec<f64>)],
    bins: usize,
    palette: &Palette,
) -> Result<(), Report> {
    let bins = bins.max(1);
    let (min, max) = match min_max(groups.iter().flat_map(|(_, values)| values.iter().copied()))
    {
        Some(bounds) => bounds,
        None => return Ok(()),
    };
    // degenerate distributions still get one visible bin
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    // per-group bin counts
    let counts: Vec<Vec<usize>> = groups
        .iter()
        .map(|(_, values)| {
            let mut counts = vec![0usize; bins];
            for value in values {
                let bin = (((value - min) / width) as usize).min(bins - 1);
                counts[bin] += 1;
            }
            counts
        })
        .collect();
    let y_max = counts
        .iter()
        .flat_map(|counts| counts.iter().copied())
        .max()
        .unwrap_or(0) as f64;

    let root = SVGBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    draw!(root.fill(&WHITE));
    let mut chart = draw!(ChartBuilder::on(&root)
        .caption(title, (FONT, TITLE_SIZE))
        .margin(10)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(min..(min + width * bins as f64), 0.0..y_max * 1.05));
    draw!(chart
        .configure_mesh()
        .x_desc(x_label)
        .y_desc("Frequency")
        .label_style((FONT, LABEL_SIZE))
        .draw());

    let multi = groups.len() > 1;
    for (index, ((label, _), counts)) in groups.iter().zip(counts.iter()).enumerate() {
        let color = palette.color(index);
        let fill = if multi { color.mix(0.6) } else { color.mix(0.9) };
        let series = draw!(chart.draw_series(counts.iter().enumerate().filter_map(
            |(bin, count)| {
                if *count == 0 {
                    return None;
                }
                let x0 = min + bin as f64 * width;
                let x1 = x0 + width;
                let mut bar =
                    Rectangle::new([(x0, 0.0), (x1, *count as f64)], fill.filled());
                bar.set_margin(0, 0, 1, 1);
                Some(bar)
            }
        )));
        if multi {
            series.label(label.clone()).legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
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
