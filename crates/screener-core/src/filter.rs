use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Board, StockInfo};

/// Pre-filter thresholds handed to the candidate source.
///
/// Numeric minimums and `max_price` are only applied when non-zero, and an
/// empty `industry` means every industry is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockFilter {
    /// Minimum latest weighted ROE (%)
    pub min_roe: f64,
    pub min_netprofit_yoy_ratio: f64,
    /// Minimum total operating income YoY ratio (%)
    pub min_toi_yoy_ratio: f64,
    /// Minimum latest dividend yield (%)
    pub min_dividend_yield: f64,
    pub min_netprofit_growthrate_3y: f64,
    pub min_income_growthrate_3y: f64,
    /// Minimum annualized return since listing (%)
    pub min_listing_yield_year: f64,
    pub min_pb_mrq: f64,
    pub min_predict_netprofit_ratio: f64,
    pub min_predict_income_ratio: f64,
    pub min_total_market_cap: f64,
    pub industry: String,
    pub min_price: f64,
    pub max_price: f64,
    pub listing_over_5y: bool,
    /// Skip ChiNext (growth board) listings
    pub exclude_growth_board: bool,
    /// Skip STAR market listings
    pub exclude_star_board: bool,
}

impl Default for StockFilter {
    fn default() -> Self {
        Self {
            min_roe: 8.0,
            min_netprofit_yoy_ratio: 0.0,
            min_toi_yoy_ratio: 0.0,
            min_dividend_yield: 0.0,
            min_netprofit_growthrate_3y: 0.0,
            min_income_growthrate_3y: 0.0,
            min_listing_yield_year: 0.0,
            min_pb_mrq: 0.0,
            min_predict_netprofit_ratio: 0.0,
            min_predict_income_ratio: 0.0,
            min_total_market_cap: 0.0,
            industry: String::new(),
            min_price: 0.0,
            max_price: 0.0,
            listing_over_5y: false,
            exclude_growth_board: true,
            exclude_star_board: true,
        }
    }
}

fn at_least(value: f64, min: f64) -> bool {
    min == 0.0 || value >= min
}

impl StockFilter {
    /// Whether `info` passes every configured threshold as of `today`.
    pub fn admits(&self, info: &StockInfo, today: NaiveDate) -> bool {
        let minimums = [
            (info.roe_weight, self.min_roe),
            (info.netprofit_yoy_ratio, self.min_netprofit_yoy_ratio),
            (info.toi_yoy_ratio, self.min_toi_yoy_ratio),
            (info.dividend_yield, self.min_dividend_yield),
            (info.netprofit_growthrate_3y, self.min_netprofit_growthrate_3y),
            (info.income_growthrate_3y, self.min_income_growthrate_3y),
            (info.listing_yield_year, self.min_listing_yield_year),
            (info.pb_mrq, self.min_pb_mrq),
            (info.predict_netprofit_ratio, self.min_predict_netprofit_ratio),
            (info.predict_income_ratio, self.min_predict_income_ratio),
            (info.total_market_cap, self.min_total_market_cap),
            (info.price, self.min_price),
        ];
        if !minimums.iter().all(|&(value, min)| at_least(value, min)) {
            return false;
        }

        if self.max_price != 0.0 && info.price > self.max_price {
            return false;
        }

        let industry = self.industry.trim();
        if !industry.is_empty() && !info.industry.eq_ignore_ascii_case(industry) {
            return false;
        }

        match info.board() {
            Board::Growth if self.exclude_growth_board => return false,
            Board::Star if self.exclude_star_board => return false,
            _ => {}
        }

        if self.listing_over_5y {
            let listed_long_enough = info
                .listing_date
                .and_then(|d| d.checked_add_months(Months::new(60)))
                .map(|anniversary| anniversary <= today)
                .unwrap_or(false);
            if !listed_long_enough {
                return false;
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(code: &str, roe: f64, price: f64) -> StockInfo {
        StockInfo {
            secucode: format!("{}.SH", code),
            security_code: code.to_string(),
            name: format!("Company {}", code),
            market: "SH".to_string(),
            industry: "Liquor".to_string(),
            price,
            change_rate: 0.0,
            total_market_cap: 1.0e10,
            roe_weight: roe,
            pe_ttm: Some(20.0),
            pb_mrq: 3.0,
            netprofit_yoy_ratio: 10.0,
            toi_yoy_ratio: 10.0,
            dividend_yield: 1.5,
            netprofit_growthrate_3y: 12.0,
            income_growthrate_3y: 11.0,
            predict_netprofit_ratio: 0.0,
            predict_income_ratio: 0.0,
            listing_yield_year: 15.0,
            listing_date: NaiveDate::from_ymd_opt(2001, 8, 27),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_default_filter_values() {
        let f = StockFilter::default();
        assert_eq!(f.min_roe, 8.0);
        assert!(f.exclude_growth_board);
        assert!(f.exclude_star_board);
        assert!(!f.listing_over_5y);
        assert!(f.industry.is_empty());
        assert_eq!(f.max_price, 0.0);
    }

    #[test]
    fn test_min_roe() {
        let f = StockFilter::default();
        assert!(f.admits(&info("600519", 30.0, 1500.0), today()));
        assert!(!f.admits(&info("600519", 7.9, 1500.0), today()));
    }

    #[test]
    fn test_zero_threshold_is_unconstrained() {
        let f = StockFilter { min_roe: 0.0, ..Default::default() };
        let mut i = info("600519", -5.0, 10.0);
        i.netprofit_yoy_ratio = -40.0;
        assert!(f.admits(&i, today()));
    }

    #[test]
    fn test_price_bounds() {
        let f = StockFilter { min_price: 10.0, max_price: 100.0, ..Default::default() };
        assert!(f.admits(&info("600000", 10.0, 50.0), today()));
        assert!(!f.admits(&info("600000", 10.0, 5.0), today()));
        assert!(!f.admits(&info("600000", 10.0, 150.0), today()));
    }

    #[test]
    fn test_board_exclusion() {
        let f = StockFilter::default();
        assert!(!f.admits(&info("300750", 20.0, 200.0), today()));
        assert!(!f.admits(&info("688981", 20.0, 50.0), today()));

        let f = StockFilter {
            exclude_growth_board: false,
            exclude_star_board: false,
            ..Default::default()
        };
        assert!(f.admits(&info("300750", 20.0, 200.0), today()));
        assert!(f.admits(&info("688981", 20.0, 50.0), today()));
    }

    #[test]
    fn test_industry_restriction() {
        let f = StockFilter { industry: "liquor".to_string(), ..Default::default() };
        assert!(f.admits(&info("600519", 20.0, 1500.0), today()));

        let f = StockFilter { industry: "Banking".to_string(), ..Default::default() };
        assert!(!f.admits(&info("600519", 20.0, 1500.0), today()));

        let f = StockFilter { industry: " Liquor ".to_string(), ..Default::default() };
        assert!(f.admits(&info("600519", 20.0, 1500.0), today()));
    }

    #[test]
    fn test_blank_industry_is_unrestricted() {
        let f = StockFilter { industry: "   ".to_string(), ..Default::default() };
        assert!(f.admits(&info("600519", 20.0, 1500.0), today()));
    }

    #[test]
    fn test_listing_over_5y() {
        let f = StockFilter { listing_over_5y: true, ..Default::default() };
        assert!(f.admits(&info("600519", 20.0, 1500.0), today()));

        let mut young = info("600519", 20.0, 1500.0);
        young.listing_date = NaiveDate::from_ymd_opt(2021, 1, 1);
        assert!(!f.admits(&young, today()));

        young.listing_date = None;
        assert!(!f.admits(&young, today()));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let f: StockFilter = serde_json::from_str(r#"{"min_roe": 15.0, "industry": "Banking"}"#).unwrap();
        assert_eq!(f.min_roe, 15.0);
        assert_eq!(f.industry, "Banking");
        assert!(f.exclude_growth_board);
    }
}
