#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use finance_mcp::MarketDataProvider;
use market_core::{HistoryInterval, HistoryPeriod};
use serde_json::{json, Map, Value};
use yahoo::{PriceBar, PriceHistory, Statement, StatementTable, YahooError};

/// In-memory provider; every field is what the matching call returns.
#[derive(Default)]
pub struct FakeProvider {
    pub info: Option<Map<String, Value>>,
    pub news: Option<Value>,
    pub history_error: Option<fn() -> YahooError>,
    pub failing_statement: Option<Statement>,
    pub calls: AtomicUsize,
    pub last_history_args: Mutex<Option<(String, HistoryPeriod, HistoryInterval)>>,
}

impl FakeProvider {
    pub fn with_info(info: Value) -> Self {
        let Value::Object(map) = info else {
            panic!("info fixture must be an object");
        };
        Self {
            info: Some(map),
            ..Self::default()
        }
    }

    pub fn with_news(news: Value) -> Self {
        Self {
            news: Some(news),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn statement_fixture(item: &str, value: f64) -> StatementTable {
    let mut values = BTreeMap::new();
    values.insert("2023-12-31".to_string(), value);
    let mut table = BTreeMap::new();
    table.insert(item.to_string(), values);
    StatementTable(table)
}

pub fn bar(date: &str, close: f64) -> PriceBar {
    PriceBar {
        date: date.to_string(),
        open: Some(close - 1.0),
        high: Some(close + 1.0),
        low: Some(close - 2.0),
        close: Some(close),
        volume: Some(1_000),
        dividends: 0.0,
        stock_splits: 0.0,
    }
}

#[async_trait]
impl MarketDataProvider for FakeProvider {
    async fn info(&self, ticker: &str) -> Result<Map<String, Value>, YahooError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.info
            .clone()
            .ok_or_else(|| YahooError::NotFound(format!("Quote not found for symbol: {ticker}")))
    }

    async fn history(
        &self,
        ticker: &str,
        period: HistoryPeriod,
        interval: HistoryInterval,
    ) -> Result<PriceHistory, YahooError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_history_args.lock().unwrap() = Some((ticker.to_string(), period, interval));

        if let Some(make_error) = self.history_error {
            return Err(make_error());
        }

        Ok(PriceHistory {
            ticker: ticker.to_string(),
            period,
            interval,
            currency: Some("USD".into()),
            timezone: Some("America/New_York".into()),
            rows: vec![bar("2024-05-01T13:30:00Z", 10.0), bar("2024-05-02T13:30:00Z", 11.0)],
        })
    }

    async fn statement(
        &self,
        _ticker: &str,
        statement: Statement,
    ) -> Result<StatementTable, YahooError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_statement == Some(statement) {
            return Err(YahooError::EmptyResponse("fundamentals-timeseries".into()));
        }

        Ok(match statement {
            Statement::Income => statement_fixture("TotalRevenue", 100.0),
            Statement::CashFlow => statement_fixture("FreeCashFlow", 20.0),
            Statement::BalanceSheet => statement_fixture("TotalAssets", 500.0),
        })
    }

    async fn news(&self, _ticker: &str) -> Result<Value, YahooError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.news.clone().unwrap_or_else(|| json!([])))
    }
}
