use crate::metrics::FinancialMetrics;

/// Period-over-period revenue growth for a chronologically ordered series.
///
/// Returns one growth figure per input element. The first element is always
/// `0.0` (no prior period); each subsequent element is
/// `(curr.revenue - prev.revenue) / prev.revenue`, with a non-positive prior
/// revenue yielding `0.0`. The caller guarantees the series is sorted
/// chronologically per company; this function does no grouping or sorting.
pub fn calculate_yoy_growth(metrics: &[FinancialMetrics]) -> Vec<f64> {
    let mut growth = Vec::with_capacity(metrics.len());
    if metrics.is_empty() {
        return growth;
    }

    growth.push(0.0); // no prior period for the first entry

    for window in metrics.windows(2) {
        let prev = window[0].record.revenue;
        let curr = window[1].record.revenue;
        let yoy = if prev > 0.0 { (curr - prev) / prev } else { 0.0 };
        growth.push(yoy);
    }

    growth
}
