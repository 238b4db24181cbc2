pub mod client;
pub mod error;
pub mod models;
pub mod statements;

pub use client::{ProxyOptions, YahooRestClient};
pub use error::YahooError;
pub use models::{PriceBar, PriceHistory};
pub use statements::{Statement, StatementTable};
