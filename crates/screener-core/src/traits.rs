use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{Defect, ScreenerError, Stock, StockFilter, StockInfo};

/// Supplies the pre-filtered candidate universe for one screening run.
///
/// An error here is fatal to the run.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch_candidates(
        &self,
        cancel: &CancellationToken,
        filter: &StockFilter,
    ) -> Result<Vec<StockInfo>, ScreenerError>;
}

/// Builds the enriched record (financial history, valuation) for one candidate.
///
/// Implementations should return [`ScreenerError::Cancelled`] promptly once
/// `cancel` fires. An error here only drops the affected candidate.
#[async_trait]
pub trait RecordBuilder: Send + Sync {
    async fn build_record(
        &self,
        cancel: &CancellationToken,
        info: &StockInfo,
    ) -> Result<Stock, ScreenerError>;
}

/// Decides pass/fail for one company. An empty defect list means the company passes.
pub trait RuleEvaluator: Send + Sync {
    fn evaluate(&self, stock: &Stock) -> Vec<Defect>;
}
