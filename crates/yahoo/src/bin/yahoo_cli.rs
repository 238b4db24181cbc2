use anyhow::Result;
use clap::{Parser, Subcommand};
use market_core::{AppConfig, HistoryInterval, HistoryPeriod, CONFIG};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use yahoo::{Statement, YahooRestClient};

#[derive(Parser, Debug)]
#[command(name = "yahoo-cli", about = "Standalone Yahoo Finance API smoke tester", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the `currentPrice` field of a ticker
    Price {
        /// Ticker symbol, e.g. AAPL
        #[arg(long, short = 't')]
        ticker: String,
    },
    /// Print historical bars
    History {
        /// Ticker symbol, e.g. AAPL
        #[arg(long, short = 't')]
        ticker: String,
        /// Range, e.g. 1mo, 1y, ytd
        #[arg(long, short = 'p', default_value = "1mo")]
        period: HistoryPeriod,
        /// Bar size, e.g. 1d, 1wk
        #[arg(long, short = 'i', default_value = "1d")]
        interval: HistoryInterval,
    },
    /// Print flattened company metadata
    Info {
        #[arg(long, short = 't')]
        ticker: String,
    },
    /// Print income statement, cash flow and balance sheet
    Financials {
        #[arg(long, short = 't')]
        ticker: String,
    },
    /// Print the raw news stream
    News {
        #[arg(long, short = 't')]
        ticker: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();
    let config: &AppConfig = &CONFIG;
    let client = YahooRestClient::from_config(config)?;

    match cli.command {
        Command::Price { ticker } => {
            let info = client.quote_summary(&ticker).await?;
            match info.get("currentPrice") {
                Some(price) => println!("{}", price),
                None => println!("{ticker}: no currentPrice in quote summary"),
            }
        }
        Command::History {
            ticker,
            period,
            interval,
        } => {
            let history = client.chart(&ticker, period, interval).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
        Command::Info { ticker } => {
            let info = client.quote_summary(&ticker).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Financials { ticker } => {
            let (income, cashflow, balance) = tokio::try_join!(
                client.financial_statement(&ticker, Statement::Income),
                client.financial_statement(&ticker, Statement::CashFlow),
                client.financial_statement(&ticker, Statement::BalanceSheet),
            )?;
            let bundle = json!({
                "income_statement": income,
                "cashflow": cashflow,
                "balance_sheet": balance,
            });
            println!("{}", serde_json::to_string_pretty(&bundle)?);
        }
        Command::News { ticker } => {
            let news = client.news(&ticker).await?;
            println!("{}", serde_json::to_string_pretty(&news)?);
        }
    }

    Ok(())
}

fn init_tracing() -> Result<()> {
    // stdout is reserved for the JSON the commands print.
    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .finish(),
    );
    Ok(())
}
