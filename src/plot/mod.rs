mod bar;
mod boxplot;
mod histogram;
mod line;
mod scatter;
pub mod style;

// Re-exports.
pub use bar::{grouped_bar, stacked_bar};
pub use boxplot::box_plot;
pub use histogram::histogram;
pub use line::median_line;
pub use scatter::scatter;
pub use style::Palette;

use std::ops::Range;

/// Converts a drawing-layer error into a `Report`.
#[macro_export]
macro_rules! draw {
    ($call:expr) => {
        $call.map_err(|error| color_eyre::eyre::eyre!("drawing error: {}", error))?
    };
}

/// Smallest and largest of an iterator of values.
pub(crate) fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    values.into_iter().fold(None, |acc, value| match acc {
        None => Some((value, value)),
        Some((min, max)) => Some((min.min(value), max.max(value))),
    })
}

/// A y-range with a little headroom so marks never sit on the frame.
pub(crate) fn padded_range(min: f64, max: f64) -> Range<f64> {
    if min == max {
        (min - 1.0)..(max + 1.0)
    } else {
        let pad = (max - min) * 0.05;
        (min - pad)..(max + pad)
    }
}
