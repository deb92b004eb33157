use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exchange board a security is listed on, derived from its security code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Board {
    Main,
    /// ChiNext growth enterprise board (codes 300xxx / 301xxx)
    Growth,
    /// STAR market (codes 688xxx / 689xxx)
    Star,
}

impl Board {
    pub fn from_security_code(code: &str) -> Self {
        if code.starts_with("300") || code.starts_with("301") {
            Board::Growth
        } else if code.starts_with("688") || code.starts_with("689") {
            Board::Star
        } else {
            Board::Main
        }
    }
}

/// Base info for one candidate company as returned by the candidate source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInfo {
    /// Code with exchange suffix, e.g. `600519.SH`
    pub secucode: String,
    pub security_code: String,
    pub name: String,
    #[serde(default)]
    pub market: String,
    #[serde(default)]
    pub industry: String,
    pub price: f64,
    #[serde(default)]
    pub change_rate: f64,
    /// Total market cap in currency units
    #[serde(default)]
    pub total_market_cap: f64,
    /// Latest weighted ROE (%)
    pub roe_weight: f64,
    #[serde(default)]
    pub pe_ttm: Option<f64>,
    #[serde(default)]
    pub pb_mrq: f64,
    #[serde(default)]
    pub netprofit_yoy_ratio: f64,
    /// Total operating income YoY ratio (%)
    #[serde(default)]
    pub toi_yoy_ratio: f64,
    /// Latest dividend yield (%)
    #[serde(default)]
    pub dividend_yield: f64,
    #[serde(default)]
    pub netprofit_growthrate_3y: f64,
    #[serde(default)]
    pub income_growthrate_3y: f64,
    #[serde(default)]
    pub predict_netprofit_ratio: f64,
    #[serde(default)]
    pub predict_income_ratio: f64,
    /// Annualized return since listing (%)
    #[serde(default)]
    pub listing_yield_year: f64,
    #[serde(default)]
    pub listing_date: Option<NaiveDate>,
}

impl StockInfo {
    pub fn board(&self) -> Board {
        Board::from_security_code(&self.security_code)
    }
}

/// Valuation bucket reported by the data provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationLevel {
    Low,
    Medium,
    High,
    VeryHigh,
    #[default]
    Unknown,
}

impl ValuationLevel {
    pub fn to_label(&self) -> &'static str {
        match self {
            ValuationLevel::Low => "low",
            ValuationLevel::Medium => "medium",
            ValuationLevel::High => "high",
            ValuationLevel::VeryHigh => "very high",
            ValuationLevel::Unknown => "unknown",
        }
    }
}

/// Annual financial series, most recent year first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialHistory {
    #[serde(default)]
    pub roe: Vec<f64>,
    #[serde(default)]
    pub eps: Vec<f64>,
    /// Total operating revenue
    #[serde(default)]
    pub revenue: Vec<f64>,
    #[serde(default)]
    pub net_profit: Vec<f64>,
    /// Latest debt-to-assets ratio (%)
    #[serde(default)]
    pub debt_ratio: Option<f64>,
    #[serde(default)]
    pub valuation: ValuationLevel,
    #[serde(default)]
    pub fair_price: Option<f64>,
}

/// A candidate enriched with its financial history; the unit the rules evaluate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stock {
    pub info: StockInfo,
    pub history: FinancialHistory,
}

impl Stock {
    pub fn new(info: StockInfo, history: FinancialHistory) -> Self {
        Self { info, history }
    }

    /// Ranking key for the final result.
    pub fn roe(&self) -> f64 {
        self.info.roe_weight
    }

    pub fn symbol(&self) -> &str {
        &self.info.secucode
    }
}

/// Named fundamental series, used in defect reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Roe,
    Eps,
    Revenue,
    NetProfit,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Metric::Roe => "ROE",
            Metric::Eps => "EPS",
            Metric::Revenue => "revenue",
            Metric::NetProfit => "net profit",
        };
        f.write_str(label)
    }
}

/// One rule violation recorded against a company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Defect {
    RoeTooLow { latest: f64, min: f64 },
    NotIncreasing { metric: Metric, years: usize },
    InsufficientHistory { metric: Metric, have: usize, need: usize },
    ValuationTooHigh(ValuationLevel),
    PriceAboveFair { price: f64, fair_price: f64 },
    DebtRatioTooHigh { ratio: f64, max: f64 },
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Defect::RoeTooLow { latest, min } => {
                write!(f, "latest ROE {:.2}% is below {:.2}%", latest, min)
            }
            Defect::NotIncreasing { metric, years } => {
                write!(f, "{} not increasing over the last {} years", metric, years)
            }
            Defect::InsufficientHistory { metric, have, need } => {
                write!(f, "{} history has {} years, need {}", metric, have, need)
            }
            Defect::ValuationTooHigh(level) => {
                write!(f, "valuation is {}", level.to_label())
            }
            Defect::PriceAboveFair { price, fair_price } => {
                write!(f, "price {:.2} is above fair price {:.2}", price, fair_price)
            }
            Defect::DebtRatioTooHigh { ratio, max } => {
                write!(f, "debt ratio {:.2}% exceeds {:.2}%", ratio, max)
            }
        }
    }
}
