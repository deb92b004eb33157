use screener_core::{Defect, Metric, RuleEvaluator, Stock, ValuationLevel};
use serde::{Deserialize, Serialize};

/// Thresholds for the fundamental quality rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Latest ROE must be at least this (%)
    pub min_roe: f64,
    /// Below this average ROE the ROE series must also be rising
    pub roe_trend_threshold: f64,
    /// Number of annual data points each growth series is checked over
    pub trend_years: usize,
    /// Ceiling for the latest debt-to-assets ratio (%)
    pub max_debt_ratio: f64,
    pub check_valuation: bool,
    pub check_fair_price: bool,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            min_roe: 8.0,
            roe_trend_threshold: 20.0,
            trend_years: 3,
            max_debt_ratio: 60.0,
            check_valuation: true,
            check_fair_price: true,
        }
    }
}

/// Evaluates one company against the fundamental quality rules.
///
/// Every rule runs; each violation becomes one [`Defect`].
pub struct FundamentalChecker {
    options: CheckerOptions,
}

impl Default for FundamentalChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl FundamentalChecker {
    pub fn new() -> Self {
        Self {
            options: CheckerOptions::default(),
        }
    }

    pub fn with_options(options: CheckerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CheckerOptions {
        &self.options
    }

    pub fn check_fundamentals(&self, stock: &Stock) -> Vec<Defect> {
        let history = &stock.history;
        let mut defects = Vec::new();

        self.check_roe(stock, &mut defects);

        for (metric, series) in [
            (Metric::Eps, &history.eps),
            (Metric::Revenue, &history.revenue),
            (Metric::NetProfit, &history.net_profit),
        ] {
            if let Some(defect) = self.check_growth(metric, series) {
                defects.push(defect);
            }
        }

        if self.options.check_valuation
            && matches!(history.valuation, ValuationLevel::High | ValuationLevel::VeryHigh)
        {
            defects.push(Defect::ValuationTooHigh(history.valuation));
        }

        if self.options.check_fair_price {
            if let Some(fair_price) = history.fair_price {
                if stock.info.price > fair_price {
                    defects.push(Defect::PriceAboveFair {
                        price: stock.info.price,
                        fair_price,
                    });
                }
            }
        }

        if let Some(ratio) = history.debt_ratio {
            if ratio > self.options.max_debt_ratio {
                defects.push(Defect::DebtRatioTooHigh {
                    ratio,
                    max: self.options.max_debt_ratio,
                });
            }
        }

        defects
    }

    fn check_roe(&self, stock: &Stock, defects: &mut Vec<Defect>) {
        let roe = &stock.history.roe;
        let latest = roe.first().copied().unwrap_or(stock.info.roe_weight);
        if latest < self.options.min_roe {
            defects.push(Defect::RoeTooLow {
                latest,
                min: self.options.min_roe,
            });
        }

        let years = self.options.trend_years;
        if roe.len() < years {
            defects.push(Defect::InsufficientHistory {
                metric: Metric::Roe,
                have: roe.len(),
                need: years,
            });
            return;
        }

        let window = &roe[..years];
        let average = window.iter().sum::<f64>() / years as f64;
        if average < self.options.roe_trend_threshold && !is_increasing(window) {
            defects.push(Defect::NotIncreasing {
                metric: Metric::Roe,
                years,
            });
        }
    }

    fn check_growth(&self, metric: Metric, series: &[f64]) -> Option<Defect> {
        let years = self.options.trend_years;
        if series.len() < years {
            return Some(Defect::InsufficientHistory {
                metric,
                have: series.len(),
                need: years,
            });
        }
        if !is_increasing(&series[..years]) {
            return Some(Defect::NotIncreasing { metric, years });
        }
        None
    }
}

impl RuleEvaluator for FundamentalChecker {
    fn evaluate(&self, stock: &Stock) -> Vec<Defect> {
        let defects = self.check_fundamentals(stock);
        tracing::debug!(
            symbol = %stock.symbol(),
            defect_count = defects.len(),
            "fundamental check finished"
        );
        defects
    }
}

/// True when a most-recent-first series rises strictly year over year.
fn is_increasing(recent_first: &[f64]) -> bool {
    recent_first.windows(2).all(|w| w[0] > w[1])
}
