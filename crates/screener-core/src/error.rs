use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScreenerError {
    #[error("Candidate source error: {0}")]
    CandidateSource(String),

    #[error("Enrichment error for {symbol}: {reason}")]
    Enrichment { symbol: String, reason: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ScreenerError {
    pub fn enrichment(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        ScreenerError::Enrichment {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}
