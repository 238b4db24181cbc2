pub mod config;
pub mod types;

pub use config::{AppConfig, YahooEndpoints, CONFIG};
pub use types::{HistoryInterval, HistoryPeriod};
