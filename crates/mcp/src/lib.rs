pub mod company;
pub mod error;
pub mod market;
pub mod news;
pub mod provider;
pub mod server;

pub use error::ToolError;
pub use news::{normalize_news, NormalizedNewsItem};
pub use provider::MarketDataProvider;
pub use server::FinanceServer;
