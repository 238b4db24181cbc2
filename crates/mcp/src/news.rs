//! Flattening of upstream news records into a fixed four-field shape.
//!
//! Upstream records are schema-less: `content`, `content.provider` and every
//! leaf may be missing or of the wrong type. Each field resolves on its own to
//! a string or `None`; a malformed level never fails the whole record.

use rmcp::schemars;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::market::{validate_ticker, TickerRequest};
use crate::provider::MarketDataProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct NormalizedNewsItem {
    /// Headline of the article.
    pub title: Option<String>,
    /// Short summary of the article.
    pub summary: Option<String>,
    /// Publication time as sent upstream (ISO 8601).
    pub published_date: Option<String>,
    /// URL of the article's provider.
    pub link: Option<String>,
}

impl NormalizedNewsItem {
    pub fn from_raw(item: &Value) -> Self {
        let content = member(Some(item), "content");
        let provider = member(content, "provider");

        Self {
            title: text(member(content, "title")),
            summary: text(member(content, "summary")),
            published_date: text(member(content, "pubDate")),
            link: text(member(provider, "url")),
        }
    }
}

/// One normalized record per raw record, in input order.
///
/// Only a top-level payload that is not a list is rejected.
pub fn normalize_news(raw: &Value) -> Result<Vec<NormalizedNewsItem>, ToolError> {
    let items = raw.as_array().ok_or_else(|| {
        ToolError::InvalidInput(format!(
            "news payload must be a list, got {}",
            json_type(raw)
        ))
    })?;

    Ok(items.iter().map(NormalizedNewsItem::from_raw).collect())
}

#[instrument(skip_all, fields(ticker = %request.ticker))]
pub async fn fetch_news(
    provider: &dyn MarketDataProvider,
    request: &TickerRequest,
) -> Result<Vec<NormalizedNewsItem>, ToolError> {
    let ticker = validate_ticker(&request.ticker)?;
    let raw = provider.news(ticker).await?;
    let items = normalize_news(&raw)?;
    debug!(count = items.len(), "news normalized");
    Ok(items)
}

// A non-object parent behaves like an empty mapping.
fn member<'a>(parent: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    parent.and_then(Value::as_object).and_then(|map| map.get(key))
}

fn text(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_owned)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
