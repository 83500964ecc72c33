//! Logging facilities for Horizon Grid.
//!
//! Horizon Grid uses the `tracing` crate for instrumentation. Nothing is
//! printed unless the application installs a subscriber:
//!
//! ```ignore
//! use tracing_subscriber;
//!
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("horizon_grid::model=debug")
//!         .init();
//!
//!     // Build and drive table models...
//! }
//! ```
//!
//! Every subsystem logs under one of the [`targets`], so directives can be
//! scoped to, say, only the selection engine.

/// Span names used throughout Horizon Grid for tracing.
pub mod span_names {
    /// Full sort pass span.
    pub const SORT: &str = "horizon_grid::sort";
    /// Derived model construction span.
    pub const BUILD: &str = "horizon_grid::build";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Signal/listener registry target.
    pub const SIGNAL: &str = "horizon_grid_core::signal";
    /// Table models (array, translated) target.
    pub const MODEL: &str = "horizon_grid::model";
    /// Transaction bookkeeping target.
    pub const TRANSACTION: &str = "horizon_grid::model::transaction";
    /// Filtered view target.
    pub const FILTER: &str = "horizon_grid::model::filter";
    /// Sorted view target.
    pub const SORT: &str = "horizon_grid::model::sort";
    /// Selection engine target.
    pub const SELECTION: &str = "horizon_grid::model::selection";
    /// Performance spans target.
    pub const PERF: &str = "horizon_grid::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// This is useful for tracking the duration of whole-table passes such as
/// an initial sort or a derived model's construction scan.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_grid::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }

    /// Create a performance span that also records how many rows it covers.
    pub fn with_rows(name: &'static str, rows: usize) -> Self {
        let span =
            tracing::info_span!(target: "horizon_grid::perf", "perf", operation = name, rows);
        Self {
            span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span() {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let _span = PerfSpan::new("test_operation");
        let _rows = PerfSpan::with_rows(span_names::SORT, 12);
    }

    #[test]
    fn test_targets_are_namespaced() {
        for target in [
            targets::MODEL,
            targets::TRANSACTION,
            targets::FILTER,
            targets::SORT,
            targets::SELECTION,
        ] {
            assert!(target.starts_with("horizon_grid::model"));
        }
        assert!(targets::SIGNAL.starts_with("horizon_grid_core"));
    }
}
