use serde::Serialize;
use serde_json::{Map, Value};
use tracing::instrument;
use yahoo::{Statement, StatementTable};

use crate::error::ToolError;
use crate::market::{validate_ticker, TickerRequest};
use crate::provider::MarketDataProvider;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FinancialStatements {
    pub income_statement: StatementTable,
    pub cashflow: StatementTable,
    pub balance_sheet: StatementTable,
}

/// Upstream company metadata, returned as-is.
#[instrument(skip_all, fields(ticker = %request.ticker))]
pub async fn fetch_company_info(
    provider: &dyn MarketDataProvider,
    request: &TickerRequest,
) -> Result<Map<String, Value>, ToolError> {
    let ticker = validate_ticker(&request.ticker)?;
    Ok(provider.info(ticker).await?)
}

/// All three statements or nothing; one failing fetch fails the bundle.
#[instrument(skip_all, fields(ticker = %request.ticker))]
pub async fn fetch_financials(
    provider: &dyn MarketDataProvider,
    request: &TickerRequest,
) -> Result<FinancialStatements, ToolError> {
    let ticker = validate_ticker(&request.ticker)?;

    let (income_statement, cashflow, balance_sheet) = tokio::try_join!(
        provider.statement(ticker, Statement::Income),
        provider.statement(ticker, Statement::CashFlow),
        provider.statement(ticker, Statement::BalanceSheet),
    )?;

    Ok(FinancialStatements {
        income_statement,
        cashflow,
        balance_sheet,
    })
}
