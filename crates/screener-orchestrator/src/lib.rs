//! Screens a candidate universe for good companies.
//!
//! The [`Screener`] fetches candidates, enriches and evaluates each one under a
//! bounded number of concurrent tasks, and returns the passing companies ranked
//! by ROE.

pub mod config;
pub mod ranking;
pub mod screener;

pub use config::{ScreenerConfig, DEFAULT_MAX_WORKERS};
pub use ranking::{rank_by_roe, ScreenedStock};
pub use screener::{ScreenReport, ScreenStats, Screener};
