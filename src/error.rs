//! Unified error types for the betting tools.

use rust_decimal::Decimal;
use thiserror::Error;

/// Unified error type for the betting tools.
#[derive(Error, Debug)]
pub enum BotError {
    /// Configuration loading error.
    #[error("configuration error: {0}")]
    Config(#[from] envy::Error),

    /// Pricing parameter or input error.
    #[error("pricing error: {0}")]
    Pricing(#[from] PricingError),

    /// Market-related error.
    #[error("market error: {0}")]
    Market(#[from] MarketError),

    /// Trading/bet error.
    #[error("trading error: {0}")]
    Trading(#[from] TradingError),

    /// Forecast lookup error.
    #[error("forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// Market registry error.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// HTTP request error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the pricing functions.
///
/// `InvalidConfig` is a startup error and must stop the run; `InvalidInput`
/// only abandons the bet being priced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    /// Threshold below its allowed minimum.
    #[error("{name} must be at least {minimum}, got {value}")]
    InvalidConfig {
        /// Parameter name.
        name: &'static str,
        /// Configured value.
        value: Decimal,
        /// Smallest accepted value.
        minimum: Decimal,
    },

    /// Probability pair that cannot be priced.
    #[error("invalid arbitrage probabilities: lo={lo}, hi={hi}")]
    InvalidOrdering {
        /// Lower probability.
        lo: Decimal,
        /// Higher probability.
        hi: Decimal,
    },

    /// Other malformed argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Market data errors.
#[derive(Error, Debug)]
pub enum MarketError {
    /// Failed to fetch market information.
    #[error("failed to fetch market {id}: {reason}")]
    FetchFailed {
        /// The market id that failed.
        id: String,
        /// Reason for failure.
        reason: String,
    },

    /// Market is unknown to the API.
    #[error("market {0} not found")]
    NotFound(String),

    /// Failed to parse market data.
    #[error("failed to parse market data: {0}")]
    ParseError(String),

    /// No market snapshot on disk.
    #[error("no market snapshot found in {0}")]
    NoSnapshot(String),

    /// HTTP request failed.
    #[error("http request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// IO error on local market files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bet submission errors.
#[derive(Error, Debug)]
pub enum TradingError {
    /// Bet submission failed.
    #[error("bet submission failed: {0}")]
    SubmissionFailed(String),

    /// Bet rejected by the API.
    #[error("bet rejected with HTTP {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// Failed to cancel the residual of a limit order.
    #[error("failed to cancel bet {bet_id}: {reason}")]
    CancelFailed {
        /// Bet id.
        bet_id: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid bet parameters.
    #[error("invalid bet parameters: {0}")]
    InvalidParams(String),

    /// Balance lookup failed.
    #[error("failed to get balance: {0}")]
    BalanceFailed(String),

    /// The API key is missing.
    #[error("MANIFOLD_API_KEY is required to place bets")]
    MissingApiKey,
}

/// Forecast ("true probability") lookup errors.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// Download failed.
    #[error("failed to download {url}: {reason}")]
    Download {
        /// Source URL.
        url: String,
        /// Reason for failure.
        reason: String,
    },

    /// Table row or cell missing.
    #[error("{0} not found")]
    Missing(String),

    /// Value could not be parsed.
    #[error("failed to parse forecast value: {0}")]
    Parse(String),

    /// Value outside [0, 1].
    #[error("forecast value must be between 0 and 1, got {0}")]
    OutOfRange(Decimal),

    /// CSV decoding error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Market registry errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Registry file could not be read.
    #[error("failed to read registry {path}: {source}")]
    Read {
        /// Registry path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Registry file is malformed.
    #[error("failed to parse registry: {0}")]
    Parse(#[from] serde_json::Error),

    /// Market id not in the registry.
    #[error("market {0} is not in the registry")]
    UnknownMarket(String),
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, BotError>;
