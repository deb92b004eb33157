use crate::config::ScreenerConfig;
use crate::ranking::{rank_by_roe, ScreenedStock};
use futures_util::FutureExt;
use screener_core::{
    CancellationToken, CandidateSource, Defect, RecordBuilder, RuleEvaluator, ScreenerError,
    Stock, StockFilter, StockInfo,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

/// Per-run counters. `released` always equals `admitted` once a run returns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenStats {
    pub candidates: usize,
    pub workers: usize,
    pub admitted: usize,
    pub released: usize,
    pub passed: usize,
    pub rejected: usize,
    /// Enrichment errors, including cancellation
    pub failed: usize,
    /// Panics caught while enriching or evaluating
    pub faulted: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenReport {
    pub stocks: Vec<Stock>,
    pub stats: ScreenStats,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

#[derive(Default)]
struct RunCounters {
    admitted: AtomicUsize,
    released: AtomicUsize,
    passed: AtomicUsize,
    rejected: AtomicUsize,
    failed: AtomicUsize,
    faulted: AtomicUsize,
}

impl RunCounters {
    fn snapshot(&self, candidates: usize, workers: usize) -> ScreenStats {
        ScreenStats {
            candidates,
            workers,
            admitted: self.admitted.load(Ordering::SeqCst),
            released: self.released.load(Ordering::SeqCst),
            passed: self.passed.load(Ordering::SeqCst),
            rejected: self.rejected.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            faulted: self.faulted.load(Ordering::SeqCst),
        }
    }
}

enum Verdict {
    Passed(Stock),
    Rejected(Stock, Vec<Defect>),
}

/// Bounded concurrent fundamental screener.
pub struct Screener {
    source: Arc<dyn CandidateSource>,
    builder: Arc<dyn RecordBuilder>,
    evaluator: Arc<dyn RuleEvaluator>,
    config: ScreenerConfig,
}

impl Screener {
    pub fn new(
        source: Arc<dyn CandidateSource>,
        builder: Arc<dyn RecordBuilder>,
        evaluator: Arc<dyn RuleEvaluator>,
    ) -> Self {
        Self {
            source,
            builder,
            evaluator,
            config: ScreenerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ScreenerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ScreenerConfig {
        &self.config
    }

    /// Screen with [`StockFilter::default`].
    pub async fn screen_with_defaults(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Stock>, ScreenerError> {
        self.screen_with_filter(cancel, StockFilter::default()).await
    }

    pub async fn screen_with_filter(
        &self,
        cancel: &CancellationToken,
        filter: StockFilter,
    ) -> Result<Vec<Stock>, ScreenerError> {
        Ok(self.screen_with_report(cancel, filter).await?.stocks)
    }

    /// Fetch candidates for `filter` and screen them. Only a candidate source
    /// failure is returned as an error.
    pub async fn screen_with_report(
        &self,
        cancel: &CancellationToken,
        filter: StockFilter,
    ) -> Result<ScreenReport, ScreenerError> {
        let candidates = self.source.fetch_candidates(cancel, &filter).await?;
        tracing::info!("Screening will filter from {} stocks", candidates.len());

        let report = self.screen_candidates(cancel, candidates).await;

        tracing::info!(
            "✅ Screen complete: selected {}/{} stocks ({} rejected, {} failed, {} faulted)",
            report.stats.passed,
            report.stats.candidates,
            report.stats.rejected,
            report.stats.failed,
            report.stats.faulted
        );
        Ok(report)
    }

    /// Enrich and evaluate every candidate with at most
    /// `min(candidates.len(), max_workers)` tasks in flight, then rank the
    /// passing set. Returns once every candidate has been attempted.
    pub async fn screen_candidates(
        &self,
        cancel: &CancellationToken,
        candidates: Vec<StockInfo>,
    ) -> ScreenReport {
        let total = candidates.len();
        let workers = self.config.worker_count(total);
        let counters = Arc::new(RunCounters::default());

        if total == 0 {
            return ScreenReport {
                stocks: Vec::new(),
                stats: counters.snapshot(0, 0),
                timestamp: chrono::Utc::now(),
            };
        }

        let semaphore = Arc::new(Semaphore::new(workers));
        let results: Arc<Mutex<Vec<ScreenedStock>>> = Arc::new(Mutex::new(Vec::new()));
        let mut tasks = JoinSet::new();

        for (index, info) in candidates.into_iter().enumerate() {
            // Admission happens before spawning, so no more than `workers` tasks exist at once.
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::error!("Admission closed before {} was screened: {}", info.secucode, e);
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                    continue;
                }
            };
            counters.admitted.fetch_add(1, Ordering::SeqCst);

            let builder = Arc::clone(&self.builder);
            let evaluator = Arc::clone(&self.evaluator);
            let results = Arc::clone(&results);
            let counters = Arc::clone(&counters);
            let cancel = cancel.clone();

            tasks.spawn(async move {
                let _permit = permit;
                let symbol = info.secucode.clone();
                let name = info.name.clone();

                let outcome = AssertUnwindSafe(screen_one(
                    builder.as_ref(),
                    evaluator.as_ref(),
                    &cancel,
                    &info,
                ))
                .catch_unwind()
                .await;

                match outcome {
                    Ok(Ok(Verdict::Passed(stock))) => {
                        results.lock().await.push(ScreenedStock { index, stock });
                        counters.passed.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Ok(Verdict::Rejected(stock, defects))) => {
                        let reasons: Vec<String> = defects.iter().map(ToString::to_string).collect();
                        tracing::info!(
                            symbol = %stock.symbol(),
                            defects = ?reasons,
                            "{} {} has some defects",
                            stock.info.name,
                            stock.symbol()
                        );
                        counters.rejected.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Err(ScreenerError::Cancelled)) => {
                        tracing::warn!("Screening of {} {} cancelled", name, symbol);
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                    }
                    Ok(Err(e)) => {
                        tracing::error!("Failed to build record for {} {}: {}", name, symbol, e);
                        counters.failed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(panic) => {
                        tracing::error!(
                            "Recovered from panic while screening {} {}: {}",
                            name,
                            symbol,
                            panic_message(panic.as_ref())
                        );
                        counters.faulted.fetch_add(1, Ordering::SeqCst);
                    }
                }

                counters.released.fetch_add(1, Ordering::SeqCst);
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Screening task error: {}", e);
            }
        }

        let collected = std::mem::take(&mut *results.lock().await);
        ScreenReport {
            stocks: rank_by_roe(collected),
            stats: counters.snapshot(total, workers),
            timestamp: chrono::Utc::now(),
        }
    }
}

async fn screen_one(
    builder: &dyn RecordBuilder,
    evaluator: &dyn RuleEvaluator,
    cancel: &CancellationToken,
    info: &StockInfo,
) -> Result<Verdict, ScreenerError> {
    let stock = builder.build_record(cancel, info).await?;
    let defects = evaluator.evaluate(&stock);
    if defects.is_empty() {
        Ok(Verdict::Passed(stock))
    } else {
        Ok(Verdict::Rejected(stock, defects))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
