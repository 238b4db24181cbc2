use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
        Tool,
    },
    tool, tool_handler, tool_router,
    transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
    },
    ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::company::{fetch_company_info, fetch_financials};
use crate::error::ToolError;
use crate::market::{fetch_current_price, fetch_historical_data, HistoricalDataRequest, TickerRequest};
use crate::news::fetch_news;
use crate::provider::MarketDataProvider;

const INSTRUCTIONS: &str = "Stock market data tools backed by Yahoo Finance: current price, \
historical prices, company information, financial statements and recent news for a ticker symbol.";

/// MCP service exposing the market data tools.
#[derive(Clone)]
pub struct FinanceServer {
    provider: Arc<dyn MarketDataProvider>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FinanceServer {
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            provider,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "get_current_price",
        description = "Get the current stock price of a ticker symbol, e.g. \"AAPL\" or \"TSLA\". Returns a number such as 100.21."
    )]
    pub async fn get_current_price(
        &self,
        Parameters(request): Parameters<TickerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = fetch_current_price(self.provider.as_ref(), &request).await;
        respond("get_current_price", outcome)
    }

    #[tool(
        name = "get_historical_data",
        description = "Fetch historical price bars for a ticker symbol. Rows carry Date, Open, High, Low, Close, Volume, Dividends and Stock Splits where available."
    )]
    pub async fn get_historical_data(
        &self,
        Parameters(request): Parameters<HistoricalDataRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = fetch_historical_data(self.provider.as_ref(), &request).await;
        respond("get_historical_data", outcome)
    }

    #[tool(
        name = "get_company_info",
        description = "Retrieve general company information and metadata for a ticker symbol."
    )]
    pub async fn get_company_info(
        &self,
        Parameters(request): Parameters<TickerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = fetch_company_info(self.provider.as_ref(), &request).await;
        respond("get_company_info", outcome)
    }

    #[tool(
        name = "get_financials",
        description = "Retrieve a company's income statement, cash flow statement and balance sheet, keyed income_statement, cashflow and balance_sheet."
    )]
    pub async fn get_financials(
        &self,
        Parameters(request): Parameters<TickerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = fetch_financials(self.provider.as_ref(), &request).await;
        respond("get_financials", outcome)
    }

    #[tool(
        name = "get_news",
        description = "Retrieve recent news for a ticker symbol. Each article has title, summary, published_date (ISO 8601) and link; missing values are null."
    )]
    pub async fn get_news(
        &self,
        Parameters(request): Parameters<TickerRequest>,
    ) -> Result<CallToolResult, McpError> {
        let outcome = fetch_news(self.provider.as_ref(), &request).await;
        respond("get_news", outcome)
    }
}

#[tool_handler]
impl ServerHandler for FinanceServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "finance-mcp".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(INSTRUCTIONS.into()),
            ..ServerInfo::default()
        }
    }
}

impl FinanceServer {
    /// Tools in registration order, with their input schemas.
    pub fn tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    /// Run over stdio and wait until the peer disconnects.
    pub async fn serve_stdio(self) -> Result<()> {
        info!("serving MCP over stdio");
        let service = self
            .serve(rmcp::transport::stdio())
            .await
            .map_err(|err| anyhow!(err))?;

        service.waiting().await.map_err(|err| anyhow!(err))?;

        Ok(())
    }

    /// Run the stateless streamable HTTP transport until Ctrl-C.
    pub async fn serve_streamable_http(self, bind: SocketAddr, path: &str) -> Result<()> {
        let service = StreamableHttpService::new(
            move || Ok::<_, std::io::Error>(self.clone()),
            Arc::new(LocalSessionManager::default()),
            StreamableHttpServerConfig {
                stateful_mode: false,
                ..Default::default()
            },
        );

        let router = if path == "/" {
            axum::Router::new().fallback_service(service)
        } else {
            axum::Router::new().nest_service(path, service)
        }
        .layer(TraceLayer::new_for_http());

        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .with_context(|| format!("failed to bind {bind}"))?;
        info!(%bind, path, "serving MCP over streamable HTTP");

        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("shutdown signal received");
            })
            .await?;

        Ok(())
    }
}

fn respond<T: Serialize>(
    tool: &str,
    outcome: Result<T, ToolError>,
) -> Result<CallToolResult, McpError> {
    match outcome {
        Ok(payload) => Ok(CallToolResult::success(vec![Content::json(payload)?])),
        Err(err) => {
            warn!(tool, kind = err.kind(), error = %err, "tool call failed");
            Err(err.into())
        }
    }
}
