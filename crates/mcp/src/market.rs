use market_core::{HistoryInterval, HistoryPeriod};
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};
use yahoo::PriceHistory;

use crate::error::ToolError;
use crate::provider::MarketDataProvider;

const PRICE_FIELD: &str = "currentPrice";

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct TickerRequest {
    /// Stock ticker symbol, e.g. "AAPL" or "TSLA".
    pub ticker: String,
}

impl TickerRequest {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, schemars::JsonSchema)]
pub struct HistoricalDataRequest {
    /// Stock ticker symbol, e.g. "AAPL" or "TSLA".
    pub ticker: String,
    /// Time range of the series.
    #[serde(default)]
    pub period: HistoryPeriod,
    /// Granularity of each bar within the period.
    #[serde(default)]
    pub interval: HistoryInterval,
}

pub(crate) fn validate_ticker(ticker: &str) -> Result<&str, ToolError> {
    let trimmed = ticker.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidInput("ticker must not be empty".into()));
    }
    Ok(trimmed)
}

#[instrument(skip_all, fields(ticker = %request.ticker))]
pub async fn fetch_current_price(
    provider: &dyn MarketDataProvider,
    request: &TickerRequest,
) -> Result<f64, ToolError> {
    let ticker = validate_ticker(&request.ticker)?;
    let info = provider.info(ticker).await?;

    match info.get(PRICE_FIELD) {
        Some(Value::Number(price)) => price.as_f64().ok_or_else(|| missing_price(ticker)),
        Some(other) => {
            warn!(value = %other, "non-numeric {PRICE_FIELD}");
            Err(missing_price(ticker))
        }
        None => Err(missing_price(ticker)),
    }
}

#[instrument(skip_all, fields(ticker = %request.ticker, period = %request.period, interval = %request.interval))]
pub async fn fetch_historical_data(
    provider: &dyn MarketDataProvider,
    request: &HistoricalDataRequest,
) -> Result<PriceHistory, ToolError> {
    let ticker = validate_ticker(&request.ticker)?;
    let history = provider
        .history(ticker, request.period, request.interval)
        .await?;
    Ok(history)
}

fn missing_price(ticker: &str) -> ToolError {
    ToolError::NotFound(format!("{PRICE_FIELD} unavailable for {ticker}"))
}
