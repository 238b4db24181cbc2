use anyhow::{ensure, Context, Result};
use dotenvy::dotenv;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Global configuration accessor to keep the rest of the application stateless.
pub static CONFIG: Lazy<AppConfig> = Lazy::new(|| {
    AppConfig::load_from_env().expect("failed to load configuration from environment")
});

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const DEFAULT_NEWS_COUNT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YahooEndpoints {
    #[serde(default = "default_query_endpoint")]
    pub query: String,
    #[serde(default = "default_timeseries_endpoint")]
    pub timeseries: String,
    #[serde(default = "default_web_endpoint")]
    pub web: String,
    #[serde(default = "default_cookie_endpoint")]
    pub cookie: String,
}

impl Default for YahooEndpoints {
    fn default() -> Self {
        Self {
            query: default_query_endpoint(),
            timeseries: default_timeseries_endpoint(),
            web: default_web_endpoint(),
            cookie: default_cookie_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub endpoints: YahooEndpoints,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_news_count")]
    pub news_count: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoints: YahooEndpoints::default(),
            user_agent: default_user_agent(),
            news_count: default_news_count(),
        }
    }
}

impl AppConfig {
    /// Build configuration from well-known environment variables.
    pub fn load_from_env() -> Result<Self> {
        preload_env_files();

        let endpoints = YahooEndpoints {
            query: env_var_or("YAHOO_QUERY_ENDPOINT", default_query_endpoint),
            timeseries: env_var_or("YAHOO_TIMESERIES_ENDPOINT", default_timeseries_endpoint),
            web: env_var_or("YAHOO_WEB_ENDPOINT", default_web_endpoint),
            cookie: env_var_or("YAHOO_COOKIE_ENDPOINT", default_cookie_endpoint),
        };

        let user_agent = env_var_or("YAHOO_USER_AGENT", default_user_agent);

        let news_count = match env_var_non_empty("YAHOO_NEWS_COUNT") {
            Ok(raw) => parse_news_count(&raw)?,
            Err(_) => default_news_count(),
        };

        let config = Self {
            endpoints,
            user_agent,
            news_count,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject endpoint values that cannot be joined with request paths.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("YAHOO_QUERY_ENDPOINT", &self.endpoints.query),
            ("YAHOO_TIMESERIES_ENDPOINT", &self.endpoints.timeseries),
            ("YAHOO_WEB_ENDPOINT", &self.endpoints.web),
            ("YAHOO_COOKIE_ENDPOINT", &self.endpoints.cookie),
        ] {
            ensure!(
                value.starts_with("http://") || value.starts_with("https://"),
                "{name} must be an absolute http(s) URL, got {value:?}"
            );
        }
        ensure!(self.news_count > 0, "YAHOO_NEWS_COUNT must be greater than zero");
        Ok(())
    }
}

fn parse_news_count(raw: &str) -> Result<u32> {
    raw.trim()
        .parse::<u32>()
        .with_context(|| format!("YAHOO_NEWS_COUNT is not a valid count: {raw}"))
}

fn env_var_non_empty(key: &str) -> Result<String, env::VarError> {
    let value = env::var(key)?;
    if value.trim().is_empty() {
        return Err(env::VarError::NotPresent);
    }
    Ok(value)
}

fn env_var_or(key: &str, default: fn() -> String) -> String {
    env_var_non_empty(key)
        .map(|value| value.trim().trim_end_matches('/').to_string())
        .unwrap_or_else(|_| default())
}

fn default_query_endpoint() -> String {
    "https://query1.finance.yahoo.com".to_string()
}

fn default_timeseries_endpoint() -> String {
    "https://query2.finance.yahoo.com".to_string()
}

fn default_web_endpoint() -> String {
    "https://finance.yahoo.com".to_string()
}

fn default_cookie_endpoint() -> String {
    "https://fc.yahoo.com".to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_news_count() -> u32 {
    DEFAULT_NEWS_COUNT
}

fn preload_env_files() {
    // .env in the working directory wins; the workspace root is a fallback.
    let _ = dotenv();

    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let candidate = manifest_dir.join("../../.env");
    if candidate.exists() {
        let _ = dotenvy::from_path(candidate);
    }
}
