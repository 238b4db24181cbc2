use async_trait::async_trait;
use market_core::{HistoryInterval, HistoryPeriod};
use serde_json::{Map, Value};
use yahoo::{PriceHistory, Statement, StatementTable, YahooError, YahooRestClient};

/// Upstream market data source the tools delegate to.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Full company metadata mapping, including `currentPrice` when quoted.
    async fn info(&self, ticker: &str) -> Result<Map<String, Value>, YahooError>;

    async fn history(
        &self,
        ticker: &str,
        period: HistoryPeriod,
        interval: HistoryInterval,
    ) -> Result<PriceHistory, YahooError>;

    async fn statement(
        &self,
        ticker: &str,
        statement: Statement,
    ) -> Result<StatementTable, YahooError>;

    /// Raw news records, shape untouched.
    async fn news(&self, ticker: &str) -> Result<Value, YahooError>;
}

#[async_trait]
impl MarketDataProvider for YahooRestClient {
    async fn info(&self, ticker: &str) -> Result<Map<String, Value>, YahooError> {
        self.quote_summary(ticker).await
    }

    async fn history(
        &self,
        ticker: &str,
        period: HistoryPeriod,
        interval: HistoryInterval,
    ) -> Result<PriceHistory, YahooError> {
        self.chart(ticker, period, interval).await
    }

    async fn statement(
        &self,
        ticker: &str,
        statement: Statement,
    ) -> Result<StatementTable, YahooError> {
        self.financial_statement(ticker, statement).await
    }

    async fn news(&self, ticker: &str) -> Result<Value, YahooError> {
        YahooRestClient::news(self, ticker).await
    }
}
