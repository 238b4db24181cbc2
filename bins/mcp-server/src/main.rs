use std::fs;
use std::sync::{Arc, OnceLock};

use anyhow::Context;
use clap::Parser;
use finance_mcp::FinanceServer;
use market_core::CONFIG;
use tracing::{info, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry};
use yahoo::YahooRestClient;

mod config;
use config::{load_app_config, Transport};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(author, version, about = "Finance MCP server backed by Yahoo Finance", long_about = None)]
struct Cli {
    /// stdio or streamable-http
    #[arg(long)]
    transport: Option<Transport>,
    /// Listen address for the HTTP transport, e.g. 0.0.0.0:8000
    #[arg(long)]
    bind: Option<String>,
    /// Mount path for the HTTP transport
    #[arg(long)]
    path: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = load_app_config().context("failed to load server config")?;
    if let Some(transport) = cli.transport {
        settings.server.transport = transport;
    }
    if let Some(bind) = cli.bind {
        settings.server.bind = bind;
    }
    if let Some(path) = cli.path {
        settings.server.path = path;
    }

    let transport = settings.server.transport;
    init_tracing(transport);

    // Forces the .env files to load before anything reads the environment.
    let _ = &CONFIG.endpoints;
    let client = YahooRestClient::from_config_with_proxy(&CONFIG, settings.proxy_options())
        .context("failed to build Yahoo client")?;
    let server = FinanceServer::new(Arc::new(client));
    info!(%transport, tools = server.tools().len(), "finance MCP server starting");

    match transport {
        Transport::Stdio => server.serve_stdio().await,
        Transport::StreamableHttp => {
            let bind = settings.bind_addr()?;
            let path = settings.mount_path()?;
            server.serve_streamable_http(bind, &path).await
        }
    }
}

fn init_tracing(transport: Transport) {
    let log_dir = std::path::Path::new("logs");
    if let Err(err) = fs::create_dir_all(log_dir) {
        eprintln!("failed to create log directory {log_dir:?}: {err}");
    }

    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(log_dir, "finance-mcp-server.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    if tracing::subscriber::set_global_default(build_subscriber(transport, non_blocking)).is_err()
    {
        tracing::warn!("tracing already initialised");
    }
}

fn build_subscriber<W>(transport: Transport, file_writer: W) -> impl Subscriber + Send + Sync
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::from_default_env().add_directive(Level::INFO.into());

    // stdout carries the protocol when serving over stdio.
    let console_writer = match transport {
        Transport::Stdio => BoxMakeWriter::new(std::io::stderr),
        Transport::StreamableHttp => BoxMakeWriter::new(std::io::stdout),
    };
    let fmt_console = tracing_subscriber::fmt::layer().with_writer(console_writer);
    let fmt_file = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false);

    Registry::default()
        .with(env_filter)
        .with(fmt_console)
        .with(fmt_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_builds_for_every_transport() {
        for transport in [Transport::Stdio, Transport::StreamableHttp] {
            let subscriber = build_subscriber(transport, std::io::sink);
            tracing::subscriber::with_default(subscriber, || {
                info!(%transport, "subscriber ready");
            });
        }
    }
}
