//! File-backed market data provider.
//!
//! Loads a JSON universe snapshot and serves it through the candidate source
//! and record builder interfaces, applying the stock filter locally.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use screener_core::{
    CancellationToken, CandidateSource, FinancialHistory, RecordBuilder, ScreenerError, Stock,
    StockFilter, StockInfo,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One company in a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub info: StockInfo,
    #[serde(default)]
    pub financials: Option<FinancialHistory>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    #[serde(default)]
    as_of: Option<NaiveDate>,
    stocks: Vec<SnapshotEntry>,
}

#[derive(Clone)]
pub struct SnapshotProvider {
    candidates: Arc<Vec<StockInfo>>,
    financials: Arc<HashMap<String, FinancialHistory>>,
    as_of: Option<NaiveDate>,
}

impl SnapshotProvider {
    pub fn from_entries(entries: Vec<SnapshotEntry>) -> Self {
        let mut candidates = Vec::with_capacity(entries.len());
        let mut financials = HashMap::new();

        for entry in entries {
            if let Some(history) = entry.financials {
                financials.insert(entry.info.secucode.clone(), history);
            }
            candidates.push(entry.info);
        }

        Self {
            candidates: Arc::new(candidates),
            financials: Arc::new(financials),
            as_of: None,
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ScreenerError> {
        let file: SnapshotFile = serde_json::from_str(json)?;
        let as_of = file.as_of;
        let mut provider = Self::from_entries(file.stocks);
        provider.as_of = as_of;
        Ok(provider)
    }

    /// Load a snapshot file from disk.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScreenerError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let provider = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded snapshot {} with {} stocks ({} with financials)",
            path.display(),
            provider.candidates.len(),
            provider.financials.len()
        );
        Ok(provider)
    }

    /// Pin the date used for listing-age checks (defaults to the local date).
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Local::now().date_naive())
    }
}

#[async_trait]
impl CandidateSource for SnapshotProvider {
    async fn fetch_candidates(
        &self,
        cancel: &CancellationToken,
        filter: &StockFilter,
    ) -> Result<Vec<StockInfo>, ScreenerError> {
        if cancel.is_cancelled() {
            return Err(ScreenerError::Cancelled);
        }

        let today = self.today();
        let selected: Vec<StockInfo> = self
            .candidates
            .iter()
            .filter(|info| filter.admits(info, today))
            .cloned()
            .collect();

        tracing::debug!(
            "Snapshot pre-filter kept {}/{} stocks",
            selected.len(),
            self.candidates.len()
        );
        Ok(selected)
    }
}

#[async_trait]
impl RecordBuilder for SnapshotProvider {
    async fn build_record(
        &self,
        cancel: &CancellationToken,
        info: &StockInfo,
    ) -> Result<Stock, ScreenerError> {
        if cancel.is_cancelled() {
            return Err(ScreenerError::Cancelled);
        }

        let history = self
            .financials
            .get(&info.secucode)
            .ok_or_else(|| ScreenerError::enrichment(&info.secucode, "no financial history"))?;

        if history.roe.is_empty() {
            return Err(ScreenerError::enrichment(&info.secucode, "empty ROE series"));
        }

        Ok(Stock::new(info.clone(), history.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SNAPSHOT: &str = r#"{
        "as_of": "2024-06-01",
        "stocks": [
            {
                "info": {
                    "secucode": "600519.SH", "security_code": "600519", "name": "Kweichow Moutai",
                    "industry": "Liquor", "price": 1500.0, "roe_weight": 30.0,
                    "listing_date": "2001-08-27"
                },
                "financials": {
                    "roe": [30.0, 31.0, 29.0], "eps": [59.5, 49.9, 41.8],
                    "revenue": [1505.0, 1276.0, 1094.0], "net_profit": [747.0, 627.0, 525.0],
                    "debt_ratio": 19.4, "valuation": "medium"
                }
            },
            {
                "info": {
                    "secucode": "300750.SZ", "security_code": "300750", "name": "CATL",
                    "industry": "Batteries", "price": 180.0, "roe_weight": 22.0
                },
                "financials": { "roe": [22.0, 24.0, 21.0] }
            },
            {
                "info": {
                    "secucode": "600036.SH", "security_code": "600036", "name": "China Merchants Bank",
                    "industry": "Banking", "price": 33.0, "roe_weight": 14.0
                }
            },
            {
                "info": {
                    "secucode": "601988.SH", "security_code": "601988", "name": "Bank of China",
                    "industry": "Banking", "price": 4.0, "roe_weight": 7.5
                },
                "financials": { "roe": [] }
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_fetch_candidates_applies_default_filter() {
        let provider = SnapshotProvider::from_json_str(SNAPSHOT).unwrap();
        assert_eq!(provider.len(), 4);

        let cancel = CancellationToken::new();
        let candidates = provider
            .fetch_candidates(&cancel, &StockFilter::default())
            .await
            .unwrap();

        let codes: Vec<&str> = candidates.iter().map(|c| c.secucode.as_str()).collect();
        // Growth board and sub-8% ROE are filtered out, input order kept
        assert_eq!(codes, vec!["600519.SH", "600036.SH"]);
    }

    #[tokio::test]
    async fn test_fetch_candidates_respects_cancellation() {
        let provider = SnapshotProvider::from_json_str(SNAPSHOT).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = provider.fetch_candidates(&cancel, &StockFilter::default()).await;
        assert!(matches!(result, Err(ScreenerError::Cancelled)));
    }

    #[tokio::test]
    async fn test_build_record() {
        let provider = SnapshotProvider::from_json_str(SNAPSHOT).unwrap();
        let cancel = CancellationToken::new();
        let candidates = provider
            .fetch_candidates(&cancel, &StockFilter::default())
            .await
            .unwrap();

        let stock = provider.build_record(&cancel, &candidates[0]).await.unwrap();
        assert_eq!(stock.symbol(), "600519.SH");
        assert_eq!(stock.history.eps.len(), 3);

        // No financials in the snapshot
        let err = provider.build_record(&cancel, &candidates[1]).await.unwrap_err();
        assert!(matches!(err, ScreenerError::Enrichment { ref symbol, .. } if symbol == "600036.SH"));
    }

    #[tokio::test]
    async fn test_build_record_rejects_empty_roe() {
        let provider = SnapshotProvider::from_json_str(SNAPSHOT).unwrap();
        let cancel = CancellationToken::new();
        let filter = StockFilter { min_roe: 0.0, ..Default::default() };
        let candidates = provider.fetch_candidates(&cancel, &filter).await.unwrap();
        let boc = candidates.iter().find(|c| c.security_code == "601988").unwrap();

        assert!(provider.build_record(&cancel, boc).await.is_err());
    }

    #[tokio::test]
    async fn test_listing_age_uses_snapshot_date() {
        let provider = SnapshotProvider::from_json_str(SNAPSHOT).unwrap();
        let cancel = CancellationToken::new();
        let filter = StockFilter { listing_over_5y: true, ..Default::default() };

        let candidates = provider.fetch_candidates(&cancel, &filter).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].security_code, "600519");
    }

    #[tokio::test]
    async fn test_with_as_of_overrides_snapshot_date() {
        // Moutai listed 2001-08-27; five years later it qualifies
        let provider = SnapshotProvider::from_json_str(SNAPSHOT)
            .unwrap()
            .with_as_of(NaiveDate::from_ymd_opt(2005, 6, 1).unwrap());
        let cancel = CancellationToken::new();
        let filter = StockFilter { listing_over_5y: true, ..Default::default() };
        assert!(provider.fetch_candidates(&cancel, &filter).await.unwrap().is_empty());

        let provider = provider.with_as_of(NaiveDate::from_ymd_opt(2006, 8, 27).unwrap());
        let candidates = provider.fetch_candidates(&cancel, &filter).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].security_code, "600519");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SNAPSHOT.as_bytes()).unwrap();

        let provider = SnapshotProvider::load(file.path()).await.unwrap();
        assert_eq!(provider.len(), 4);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let result = SnapshotProvider::load("/nonexistent/snapshot.json").await;
        assert!(matches!(result, Err(ScreenerError::Io(_))));
    }
}
