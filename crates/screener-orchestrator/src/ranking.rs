//! Final ordering of the passing set.

use screener_core::Stock;
use std::cmp::Ordering;

/// A passing stock tagged with its position in the candidate list.
#[derive(Debug, Clone)]
pub struct ScreenedStock {
    pub index: usize,
    pub stock: Stock,
}

/// Descending ROE; NaN sorts last.
fn roe_descending(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
    }
}

/// Order screened stocks by ROE (highest first). Equal ROE falls back to
/// candidate order, so the output does not depend on task completion order.
pub fn rank_by_roe(mut screened: Vec<ScreenedStock>) -> Vec<Stock> {
    screened.sort_by(|a, b| {
        roe_descending(a.stock.roe(), b.stock.roe()).then_with(|| a.index.cmp(&b.index))
    });
    screened.into_iter().map(|s| s.stock).collect()
}
