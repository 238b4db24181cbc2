use std::sync::Arc;

use chrono::Utc;
use market_core::{AppConfig, HistoryInterval, HistoryPeriod, YahooEndpoints};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::{Result, YahooError};
use crate::models::{
    classify_failure, extract_news_stream, find_upstream_error, flatten_quote_summary,
    ChartEnvelope, Endpoint, PriceHistory, QuoteSummaryEnvelope, TimeseriesEnvelope,
};
use crate::statements::{Statement, StatementTable};

const QUOTE_SUMMARY_MODULES: &str =
    "financialData,quoteType,defaultKeyStatistics,assetProfile,summaryDetail";
// 2016-01-01T00:00:00Z, the earliest annual period the timeseries API serves.
const TIMESERIES_START: i64 = 1_451_606_400;

#[derive(Debug, Clone)]
pub struct YahooRestClient {
    http: Client,
    endpoints: YahooEndpoints,
    news_count: u32,
    crumb: Arc<Mutex<Option<String>>>,
}

#[derive(Debug, Clone, Default)]
pub struct ProxyOptions {
    pub http: Option<String>,
    pub https: Option<String>,
}

impl YahooRestClient {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::from_config_with_proxy(config, ProxyOptions::default())
    }

    pub fn from_config_with_proxy(config: &AppConfig, proxy: ProxyOptions) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .cookie_store(true)
            .gzip(true);

        if let Some(ref http_proxy) = proxy.http {
            tracing::info!("configuring HTTP proxy {}", http_proxy);
            builder = builder.proxy(reqwest::Proxy::http(http_proxy)?);
        }

        if let Some(ref https_proxy) = proxy.https {
            tracing::info!("configuring HTTPS proxy {}", https_proxy);
            builder = builder.proxy(reqwest::Proxy::https(https_proxy)?);
        }

        Ok(Self {
            http: builder.build()?,
            endpoints: config.endpoints.clone(),
            news_count: config.news_count,
            crumb: Arc::new(Mutex::new(None)),
        })
    }

    /// Flattened company metadata from the quote-summary modules.
    #[instrument(skip(self), fields(ticker = %ticker))]
    pub async fn quote_summary(&self, ticker: &str) -> Result<Map<String, Value>> {
        let crumb = self.crumb().await?;
        let url = self.url(
            &self.endpoints.query,
            &["v10", "finance", "quoteSummary", ticker],
        )?;
        let builder = self.http.get(url).query(&[
            ("modules", QUOTE_SUMMARY_MODULES),
            ("formatted", "false"),
            ("corsDomain", "finance.yahoo.com"),
            ("crumb", crumb.as_str()),
        ]);

        let envelope: QuoteSummaryEnvelope = self.execute(builder, Endpoint::QuoteSummary).await?;
        let body = envelope.quote_summary;

        match body.result.and_then(|results| results.into_iter().next()) {
            Some(modules) => Ok(flatten_quote_summary(modules)),
            None => Err(match body.error {
                Some(error) => classify_failure(Endpoint::QuoteSummary, StatusCode::OK, Some(error), ""),
                None => YahooError::NotFound(format!("no quote summary for {ticker}")),
            }),
        }
    }

    #[instrument(skip(self), fields(ticker = %ticker, period = %period, interval = %interval))]
    pub async fn chart(
        &self,
        ticker: &str,
        period: HistoryPeriod,
        interval: HistoryInterval,
    ) -> Result<PriceHistory> {
        let url = self.url(&self.endpoints.query, &["v8", "finance", "chart", ticker])?;
        let builder = self.http.get(url).query(&[
            ("range", period.as_str()),
            ("interval", interval.as_str()),
            ("events", "div,splits"),
            ("includePrePost", "false"),
        ]);

        let envelope: ChartEnvelope = self.execute(builder, Endpoint::Chart).await?;
        let body = envelope.chart;

        match body.result.and_then(|results| results.into_iter().next()) {
            Some(result) => Ok(PriceHistory::from_chart(ticker, period, interval, result)),
            None => Err(match body.error {
                Some(error) => classify_failure(Endpoint::Chart, StatusCode::OK, Some(error), ""),
                None => YahooError::EmptyResponse(Endpoint::Chart.as_str().into()),
            }),
        }
    }

    #[instrument(skip(self), fields(ticker = %ticker, statement = statement.key()))]
    pub async fn financial_statement(
        &self,
        ticker: &str,
        statement: Statement,
    ) -> Result<StatementTable> {
        let url = self.url(
            &self.endpoints.timeseries,
            &[
                "ws",
                "fundamentals-timeseries",
                "v1",
                "finance",
                "timeseries",
                ticker,
            ],
        )?;
        let period2 = Utc::now().timestamp().to_string();
        let builder = self.http.get(url).query(&[
            ("symbol", ticker),
            ("type", statement.timeseries_types().as_str()),
            ("period1", TIMESERIES_START.to_string().as_str()),
            ("period2", period2.as_str()),
        ]);

        let envelope: TimeseriesEnvelope = self.execute(builder, Endpoint::Timeseries).await?;
        let body = envelope.timeseries;

        match (body.result, body.error) {
            (Some(results), _) => Ok(StatementTable::from_timeseries(&results)),
            (None, Some(error)) => Err(classify_failure(
                Endpoint::Timeseries,
                StatusCode::OK,
                Some(error),
                "",
            )),
            (None, None) => Err(YahooError::EmptyResponse(Endpoint::Timeseries.as_str().into())),
        }
    }

    /// Raw news stream for a ticker. Item shape is left exactly as Yahoo sent it.
    #[instrument(skip(self), fields(ticker = %ticker))]
    pub async fn news(&self, ticker: &str) -> Result<Value> {
        let mut url = self.url(&self.endpoints.web, &["xhr", "ncp"])?;
        url.query_pairs_mut()
            .append_pair("queryRef", "latestNews")
            .append_pair("serviceKey", "ncp_fin");

        let payload = json!({
            "serviceConfig": {
                "snippetCount": self.news_count,
                "s": [ticker],
            }
        });
        let builder = self.http.post(url).json(&payload);

        let response: Value = self.execute(builder, Endpoint::News).await?;
        Ok(extract_news_stream(response))
    }

    /// Cookie + crumb handshake, performed once per client and reused afterwards.
    async fn crumb(&self) -> Result<String> {
        let mut slot = self.crumb.lock().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie host answers 404 but still sets the session cookie.
        let cookie_response = self.http.get(&self.endpoints.cookie).send().await?;
        debug!(status = %cookie_response.status(), "yahoo session cookie fetched");

        let url = self.url(&self.endpoints.query, &["v1", "test", "getcrumb"])?;
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(YahooError::Handshake(format!(
                "{} returned {status}",
                Endpoint::Crumb.as_str()
            )));
        }

        let crumb = body.trim();
        if crumb.is_empty() || crumb.contains('<') {
            return Err(YahooError::Handshake("getcrumb returned no crumb".into()));
        }

        *slot = Some(crumb.to_string());
        Ok(crumb.to_string())
    }

    fn url(&self, base: &str, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(base).map_err(|err| YahooError::InvalidUrl(format!("{base}: {err}")))?;
        url.path_segments_mut()
            .map_err(|_| YahooError::InvalidUrl(base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn execute<T>(&self, builder: RequestBuilder, endpoint: Endpoint) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await?;
        let status = response.status();
        tracing::info!(endpoint = endpoint.as_str(), %status, "yahoo response");
        let body = response.text().await?;

        if status == StatusCode::UNAUTHORIZED {
            // Stale crumb; the next call performs a fresh handshake.
            self.crumb.lock().await.take();
        }

        if !status.is_success() {
            let upstream = find_upstream_error(&body);
            return Err(classify_failure(endpoint, status, upstream, &body));
        }

        serde_json::from_str(&body).map_err(YahooError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> YahooRestClient {
        YahooRestClient::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn url_segments_are_encoded() {
        let url = client()
            .url("https://query1.finance.yahoo.com", &["v8", "finance", "chart", "BRK/B"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://query1.finance.yahoo.com/v8/finance/chart/BRK%2FB"
        );
    }

    #[test]
    fn url_keeps_base_path() {
        let url = client()
            .url("http://127.0.0.1:9000/yahoo/", &["xhr", "ncp"])
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/yahoo/xhr/ncp");
    }

    #[test]
    fn rejects_unparseable_base() {
        assert!(matches!(
            client().url("not a url", &["x"]),
            Err(YahooError::InvalidUrl(_))
        ));
    }
}
