// crates/ilwe-cli/src/report.rs
// ============================================================================
// Module: Sample Count Report
// Description: Minimal sufficient sample counts per method and rate.
// Purpose: Summarise recorded searches without re-running trials.
// Dependencies: ilwe-core
// ============================================================================

//! ## Overview
//! For every `(method, p)` the report picks the smallest recorded sample
//! count whose trials are complete and meet the success threshold. Cells
//! with no such count render as `-`.

use ilwe_core::AggregateQuery;
use ilwe_core::ExperimentStore;
use ilwe_core::Method;
use ilwe_core::SearchConfig;
use ilwe_core::StoreError;
use ilwe_core::runtime::render_grid;

/// Smallest sufficient sample count for one method and rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdCell {
    /// Estimator method.
    pub method: Method,
    /// Contamination rate.
    pub contamination: f64,
    /// Smallest good sample count, if any was recorded.
    pub samples: Option<usize>,
}

/// Computes the minimal sufficient sample count for every method and rate.
///
/// # Errors
///
/// Returns [`StoreError`] when the store cannot be queried.
pub fn minimal_samples<S>(
    store: &S,
    config: &SearchConfig,
    methods: &[Method],
    rates: &[f64],
) -> Result<Vec<ThresholdCell>, StoreError>
where
    S: ExperimentStore + ?Sized,
{
    let mut cells = Vec::with_capacity(methods.len() * rates.len());
    for &method in methods {
        for &contamination in rates {
            let rows =
                store.query_aggregates(method, &AggregateQuery::for_rate(config.family, contamination))?;
            let samples = rows
                .iter()
                .filter(|row| config.is_complete(row) && config.is_good(row))
                .map(|row| row.samples)
                .min();
            cells.push(ThresholdCell {
                method,
                contamination,
                samples,
            });
        }
    }
    Ok(cells)
}

/// Renders cells as a grid with one row per rate and one column per method.
#[must_use]
pub fn render_report(cells: &[ThresholdCell], methods: &[Method], rates: &[f64]) -> String {
    let mut headers = vec!["p"];
    headers.extend(methods.iter().map(|method| method.as_str()));
    let rows: Vec<Vec<String>> = rates
        .iter()
        .map(|&rate| {
            let mut row = vec![rate.to_string()];
            for &method in methods {
                let value = cells
                    .iter()
                    .find(|cell| cell.method == method && cell.contamination.total_cmp(&rate).is_eq())
                    .and_then(|cell| cell.samples);
                row.push(value.map_or_else(|| "-".to_string(), |samples| samples.to_string()));
            }
            row
        })
        .collect();
    render_grid(&headers, &rows)
}
