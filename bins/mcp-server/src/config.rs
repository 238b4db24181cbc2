use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use ::config::{Config, ConfigError as BuilderError, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use yahoo::ProxyOptions;

const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Transport {
    Stdio,
    #[default]
    StreamableHttp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdio => "stdio",
            Self::StreamableHttp => "streamable-http",
        })
    }
}

impl FromStr for Transport {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "streamable-http" | "http" => Ok(Self::StreamableHttp),
            other => Err(ConfigError::InvalidTransport(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub transport: Transport,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            path: default_path(),
            transport: Transport::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuntimeEnvConfig {
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub https_proxy: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub runtime_env: Option<RuntimeEnvConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid socket address: {0}")]
    InvalidAddr(String),
    #[error("invalid mount path {0:?}, expected a path starting with '/'")]
    InvalidPath(String),
    #[error("unknown transport {0:?}, expected stdio or streamable-http")]
    InvalidTransport(String),
    #[error("configuration load failed: {0}")]
    Load(#[from] BuilderError),
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_path() -> String {
    "/mcp".to_string()
}

impl AppConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server
            .bind
            .parse()
            .map_err(|_| ConfigError::InvalidAddr(self.server.bind.clone()))
    }

    /// Mount path with a single leading slash and no trailing one.
    pub fn mount_path(&self) -> Result<String, ConfigError> {
        let path = self.server.path.trim();
        if !path.starts_with('/') {
            return Err(ConfigError::InvalidPath(path.to_string()));
        }

        let trimmed = path.trim_end_matches('/');
        Ok(if trimmed.is_empty() {
            "/".to_string()
        } else {
            trimmed.to_string()
        })
    }

    pub fn proxy_options(&self) -> ProxyOptions {
        match &self.runtime_env {
            Some(runtime) => ProxyOptions {
                http: runtime.http_proxy.clone().filter(|value| !value.is_empty()),
                https: runtime.https_proxy.clone().filter(|value| !value.is_empty()),
            },
            None => ProxyOptions::default(),
        }
    }
}

pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false));

    builder = builder.add_source(Environment::with_prefix("FINANCE_MCP").separator("__"));

    let config: AppConfig = builder.build()?.try_deserialize()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serve_http_on_port_8000() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr().unwrap(), "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.mount_path().unwrap(), "/mcp");
        assert_eq!(config.server.transport, Transport::StreamableHttp);
    }

    #[test]
    fn rejects_bad_bind() {
        let mut config = AppConfig::default();
        config.server.bind = "localhost".into();
        assert!(matches!(config.bind_addr(), Err(ConfigError::InvalidAddr(_))));
    }

    #[test]
    fn normalizes_mount_path() {
        let mut config = AppConfig::default();
        config.server.path = "/finance/".into();
        assert_eq!(config.mount_path().unwrap(), "/finance");

        config.server.path = "/".into();
        assert_eq!(config.mount_path().unwrap(), "/");

        config.server.path = "mcp".into();
        assert!(matches!(config.mount_path(), Err(ConfigError::InvalidPath(_))));
    }

    #[test]
    fn parses_transport_names() {
        assert_eq!("stdio".parse::<Transport>().unwrap(), Transport::Stdio);
        assert_eq!(
            "Streamable-HTTP".parse::<Transport>().unwrap(),
            Transport::StreamableHttp
        );
        assert!("sse".parse::<Transport>().is_err());
    }

    #[test]
    fn unknown_transport_from_env_fails_to_load() {
        std::env::set_var("FINANCE_MCP__SERVER__TRANSPORT", "sse");
        let rejected = load_app_config();
        std::env::set_var("FINANCE_MCP__SERVER__TRANSPORT", "stdio");
        let accepted = load_app_config();
        std::env::remove_var("FINANCE_MCP__SERVER__TRANSPORT");

        assert!(matches!(rejected, Err(ConfigError::Load(_))));
        assert_eq!(accepted.unwrap().server.transport, Transport::Stdio);
    }

    #[test]
    fn empty_proxy_values_are_ignored() {
        let config = AppConfig {
            runtime_env: Some(RuntimeEnvConfig {
                http_proxy: Some(String::new()),
                https_proxy: Some("http://127.0.0.1:7890".into()),
            }),
            ..AppConfig::default()
        };
        let proxy = config.proxy_options();
        assert_eq!(proxy.http, None);
        assert_eq!(proxy.https.as_deref(), Some("http://127.0.0.1:7890"));
    }
}
