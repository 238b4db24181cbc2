mod common;

use std::sync::Arc;

use common::FakeProvider;
use finance_mcp::company::{fetch_company_info, fetch_financials};
use finance_mcp::market::{
    fetch_current_price, fetch_historical_data, HistoricalDataRequest, TickerRequest,
};
use finance_mcp::news::fetch_news;
use finance_mcp::{FinanceServer, ToolError};
use market_core::{HistoryInterval, HistoryPeriod};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{ErrorCode, RawContent};
use serde_json::{json, Value};
use yahoo::{Statement, YahooError};

#[tokio::test]
async fn current_price_reads_current_price_field() {
    let provider = FakeProvider::with_info(json!({"currentPrice": 189.84, "symbol": "AAPL"}));
    let price = fetch_current_price(&provider, &TickerRequest::new("AAPL"))
        .await
        .unwrap();
    assert_eq!(price, 189.84);
}

#[tokio::test]
async fn current_price_missing_is_not_found() {
    let provider = FakeProvider::with_info(json!({"previousClose": 180.0}));
    let err = fetch_current_price(&provider, &TickerRequest::new("AAPL"))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
}

#[tokio::test]
async fn current_price_non_numeric_is_not_found() {
    let provider = FakeProvider::with_info(json!({"currentPrice": null}));
    let err = fetch_current_price(&provider, &TickerRequest::new("AAPL"))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
}

#[tokio::test]
async fn unknown_ticker_is_not_found() {
    let provider = FakeProvider::default();
    let err = fetch_company_info(&provider, &TickerRequest::new("ZZZZZ"))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(ref msg) if msg.contains("ZZZZZ")));
}

#[tokio::test]
async fn blank_ticker_is_rejected_before_upstream() {
    let provider = FakeProvider::with_info(json!({"currentPrice": 1.0}));
    let err = fetch_current_price(&provider, &TickerRequest::new("  "))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn company_info_is_returned_unmodified() {
    let info = json!({"longName": "Acme Corp", "sector": "Industrials", "fullTimeEmployees": 12});
    let provider = FakeProvider::with_info(info.clone());
    let result = fetch_company_info(&provider, &TickerRequest::new("ACME"))
        .await
        .unwrap();
    assert_eq!(Value::Object(result), info);
}

#[tokio::test]
async fn history_passes_selectors_through() {
    let provider = FakeProvider::default();
    let request = HistoricalDataRequest {
        ticker: " ACME ".into(),
        period: HistoryPeriod::YearToDate,
        interval: HistoryInterval::OneWeek,
    };

    let history = fetch_historical_data(&provider, &request).await.unwrap();
    assert_eq!(history.rows.len(), 2);

    let args = provider.last_history_args.lock().unwrap().clone();
    assert_eq!(
        args,
        Some(("ACME".to_string(), HistoryPeriod::YearToDate, HistoryInterval::OneWeek))
    );
}

fn range_rejected() -> YahooError {
    YahooError::InvalidRange("1m data not available".into())
}

#[tokio::test]
async fn rejected_range_surfaces_as_invalid_range() {
    let provider = FakeProvider {
        history_error: Some(range_rejected),
        ..FakeProvider::default()
    };
    let request = HistoricalDataRequest {
        ticker: "ACME".into(),
        period: HistoryPeriod::Max,
        interval: HistoryInterval::OneMinute,
    };

    let err = fetch_historical_data(&provider, &request).await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidRange(_)));
}

#[tokio::test]
async fn financials_bundle_three_statements() {
    let provider = FakeProvider::default();
    let statements = fetch_financials(&provider, &TickerRequest::new("ACME"))
        .await
        .unwrap();

    let encoded = serde_json::to_value(&statements).unwrap();
    assert_eq!(encoded["income_statement"]["TotalRevenue"]["2023-12-31"], json!(100.0));
    assert_eq!(encoded["cashflow"]["FreeCashFlow"]["2023-12-31"], json!(20.0));
    assert_eq!(encoded["balance_sheet"]["TotalAssets"]["2023-12-31"], json!(500.0));
}

#[tokio::test]
async fn one_failing_statement_fails_the_bundle() {
    let provider = FakeProvider {
        failing_statement: Some(Statement::CashFlow),
        ..FakeProvider::default()
    };
    let err = fetch_financials(&provider, &TickerRequest::new("ACME"))
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::UpstreamUnavailable(_)));
}

#[tokio::test]
async fn news_is_normalized_one_to_one() {
    let provider = FakeProvider::with_news(json!([
        {"content": {
            "title": "Acme up",
            "summary": "Shares rise",
            "pubDate": "2024-05-01T12:00:00Z",
            "provider": {"displayName": "Wire", "url": "https://example.com/a"}
        }},
        {}
    ]));

    let items = fetch_news(&provider, &TickerRequest::new("ACME")).await.unwrap();
    assert_eq!(
        serde_json::to_value(&items).unwrap(),
        json!([
            {"title": "Acme up", "summary": "Shares rise", "published_date": "2024-05-01T12:00:00Z", "link": "https://example.com/a"},
            {"title": null, "summary": null, "published_date": null, "link": null}
        ])
    );
}

#[tokio::test]
async fn malformed_news_payload_is_invalid_input() {
    let provider = FakeProvider::with_news(json!({"stream": []}));
    let err = fetch_news(&provider, &TickerRequest::new("ACME")).await.unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
}

#[test]
fn server_registers_the_five_tools() {
    let server = FinanceServer::new(Arc::new(FakeProvider::default()));
    let mut names: Vec<String> = server
        .tools()
        .into_iter()
        .map(|tool| tool.name.to_string())
        .collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "get_company_info",
            "get_current_price",
            "get_financials",
            "get_historical_data",
            "get_news",
        ]
    );
}

#[test]
fn history_schema_advertises_enumerated_selectors() {
    let server = FinanceServer::new(Arc::new(FakeProvider::default()));
    let tool = server
        .tools()
        .into_iter()
        .find(|tool| tool.name == "get_historical_data")
        .unwrap();

    let schema = serde_json::to_string(&*tool.input_schema).unwrap();
    for value in ["\"ytd\"", "\"10y\"", "\"1wk\"", "\"90m\""] {
        assert!(schema.contains(value), "schema missing {value}: {schema}");
    }
}

#[tokio::test]
async fn tool_call_returns_json_content() {
    let provider = FakeProvider::with_info(json!({"currentPrice": 42.5}));
    let server = FinanceServer::new(Arc::new(provider));

    let result = server
        .get_current_price(Parameters(TickerRequest::new("ACME")))
        .await
        .unwrap();

    let text = match &result.content[0].raw {
        RawContent::Text(text) => text.text.clone(),
        other => panic!("unexpected content {other:?}"),
    };
    assert_eq!(serde_json::from_str::<Value>(&text).unwrap(), json!(42.5));
}

#[tokio::test]
async fn tool_call_error_maps_to_mcp_code() {
    let server = FinanceServer::new(Arc::new(FakeProvider::default()));

    let err = server
        .get_company_info(Parameters(TickerRequest::new("ZZZZZ")))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
}
