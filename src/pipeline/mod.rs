mod agg;
mod derive;
mod filter;

// Re-exports.
pub use agg::{aggregate, correlation_matrix, describe, write_csv, AggSpec};
pub use derive::{apply_all, parse_status_codes, status_count, Derivation};
pub use filter::{metric_view, Cap, FactorAllowList, ViewStats};
