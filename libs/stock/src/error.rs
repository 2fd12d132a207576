use thiserror::Error;

/// Failures surfaced by the market-data and news clients and by the change
/// calculation.
#[derive(Error, Debug)]
pub enum StockError {
    /// Transport failure or non-success HTTP status.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Body did not have the expected shape, or a field could not be read.
    #[error("unexpected data format: {0}")]
    DataFormat(String),

    /// Not enough dated entries to pick a comparison pair.
    #[error("insufficient history: need {needed} dates, found {found}")]
    InsufficientHistory { needed: usize, found: usize },

    /// The provider answered with an explanation instead of data
    /// (bad symbol, rate limit, invalid key).
    #[error("provider error: {0}")]
    Provider(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl From<serde_json::Error> for StockError {
    fn from(err: serde_json::Error) -> Self {
        StockError::DataFormat(err.to_string())
    }
}
