use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat};
use market_core::{HistoryInterval, HistoryPeriod};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::YahooError;

/// Error object Yahoo embeds next to (or instead of) a `result` array.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct UpstreamErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// Which endpoint produced a response; drives error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Crumb,
    QuoteSummary,
    Chart,
    Timeseries,
    News,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crumb => "getcrumb",
            Self::QuoteSummary => "quoteSummary",
            Self::Chart => "chart",
            Self::Timeseries => "fundamentals-timeseries",
            Self::News => "news",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummaryEnvelope {
    pub quote_summary: QuoteSummaryBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuoteSummaryBody {
    #[serde(default)]
    pub result: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    pub error: Option<UpstreamErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    pub chart: ChartBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartBody {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<UpstreamErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
    #[serde(default)]
    pub events: Option<ChartEvents>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMeta {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub exchange_timezone_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<u64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartEvents {
    #[serde(default)]
    pub dividends: HashMap<String, DividendEvent>,
    #[serde(default)]
    pub splits: HashMap<String, SplitEvent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DividendEvent {
    pub amount: f64,
    pub date: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SplitEvent {
    pub date: i64,
    pub numerator: f64,
    pub denominator: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeseriesEnvelope {
    pub timeseries: TimeseriesBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeseriesBody {
    #[serde(default)]
    pub result: Option<Vec<Value>>,
    #[serde(default)]
    pub error: Option<UpstreamErrorBody>,
}

/// One row of a price history table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PriceBar {
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<u64>,
    pub dividends: f64,
    #[serde(rename = "Stock Splits")]
    pub stock_splits: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceHistory {
    pub ticker: String,
    pub period: HistoryPeriod,
    pub interval: HistoryInterval,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    pub rows: Vec<PriceBar>,
}

impl PriceHistory {
    pub fn from_chart(
        ticker: &str,
        period: HistoryPeriod,
        interval: HistoryInterval,
        result: ChartResult,
    ) -> Self {
        let ChartResult {
            meta,
            timestamp,
            indicators,
            events,
        } = result;

        let quote = indicators.quote.into_iter().next().unwrap_or_default();
        let events = events.unwrap_or_default();

        let dividends: HashMap<i64, f64> = events
            .dividends
            .into_values()
            .map(|event| (event.date, event.amount))
            .collect();
        let splits: HashMap<i64, f64> = events
            .splits
            .into_values()
            .filter(|event| event.denominator.abs() > f64::EPSILON)
            .map(|event| (event.date, event.numerator / event.denominator))
            .collect();

        let rows = timestamp
            .iter()
            .enumerate()
            .filter_map(|(idx, ts)| {
                let open = value_at(&quote.open, idx);
                let high = value_at(&quote.high, idx);
                let low = value_at(&quote.low, idx);
                let close = value_at(&quote.close, idx);
                if open.is_none() && high.is_none() && low.is_none() && close.is_none() {
                    return None;
                }

                Some(PriceBar {
                    date: format_timestamp(*ts)?,
                    open,
                    high,
                    low,
                    close,
                    volume: value_at(&quote.volume, idx),
                    dividends: dividends.get(ts).copied().unwrap_or(0.0),
                    stock_splits: splits.get(ts).copied().unwrap_or(0.0),
                })
            })
            .collect();

        Self {
            ticker: ticker.to_string(),
            period,
            interval,
            currency: meta.currency,
            timezone: meta.exchange_timezone_name,
            rows,
        }
    }
}

fn value_at<T: Copy>(series: &[Option<T>], idx: usize) -> Option<T> {
    series.get(idx).copied().flatten()
}

fn format_timestamp(seconds: i64) -> Option<String> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// Merge quote-summary modules into one flat metadata mapping.
///
/// `{raw, fmt}` wrappers collapse to their raw value, empty objects become
/// `null` and the per-module `maxAge` bookkeeping field is dropped.
pub fn flatten_quote_summary(modules: Map<String, Value>) -> Map<String, Value> {
    let mut flat = Map::new();
    for (_, module) in modules {
        let Value::Object(fields) = module else {
            continue;
        };
        for (key, value) in fields {
            if key == "maxAge" {
                continue;
            }
            flat.insert(key, unwrap_formatted(value));
        }
    }
    flat
}

fn unwrap_formatted(value: Value) -> Value {
    match value {
        Value::Object(mut fields) => {
            if fields.is_empty() {
                Value::Null
            } else if fields.contains_key("raw") {
                fields.remove("raw").unwrap_or(Value::Null)
            } else {
                Value::Object(
                    fields
                        .into_iter()
                        .map(|(key, value)| (key, unwrap_formatted(value)))
                        .collect(),
                )
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(unwrap_formatted).collect()),
        other => other,
    }
}

/// Pull `data.tickerStream.stream` out of a news response, dropping ad slots.
///
/// A payload without a stream yields an empty list, same as a ticker with no news.
pub fn extract_news_stream(payload: Value) -> Value {
    let stream = match payload.pointer("/data/tickerStream/stream") {
        Some(Value::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    Value::Array(
        stream
            .into_iter()
            .filter(|item| item.get("ad").map_or(true, is_empty_value))
            .collect(),
    )
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::String(text) => text.is_empty(),
        Value::Number(number) => number.as_f64() == Some(0.0),
    }
}

/// Find the embedded error object of any Yahoo envelope (`{"chart": {"error": ..}}` etc.).
pub fn find_upstream_error(body: &str) -> Option<UpstreamErrorBody> {
    let payload: Value = serde_json::from_str(body).ok()?;
    payload
        .as_object()?
        .values()
        .filter_map(|envelope| envelope.get("error"))
        .find(|error| error.is_object())
        .and_then(|error| serde_json::from_value(error.clone()).ok())
}

/// Map a failed Yahoo response onto the error taxonomy.
pub fn classify_failure(
    endpoint: Endpoint,
    status: StatusCode,
    upstream: Option<UpstreamErrorBody>,
    body: &str,
) -> YahooError {
    let code = upstream.as_ref().map(|err| err.code.as_str()).unwrap_or("");
    let description = upstream
        .as_ref()
        .map(|err| err.description.clone())
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| format!("{} returned {}", endpoint.as_str(), status));

    if status == StatusCode::NOT_FOUND || code.eq_ignore_ascii_case("Not Found") {
        return YahooError::NotFound(description);
    }

    let rejected = status == StatusCode::UNPROCESSABLE_ENTITY
        || status == StatusCode::BAD_REQUEST
        || code.eq_ignore_ascii_case("Unprocessable Entity")
        || code.eq_ignore_ascii_case("Bad Request");
    if endpoint == Endpoint::Chart && rejected {
        return YahooError::InvalidRange(description);
    }

    YahooError::HttpStatus {
        status,
        body: truncate_body(body),
    }
}

fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 512;
    if body.len() <= LIMIT {
        return body.to_string();
    }
    let mut end = LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}
