// 公開導出的模組
pub mod models;
pub mod errors;

// 主程式與整合測試需要，但屬於內部模組
#[doc(hidden)]
pub mod scrapers;
#[doc(hidden)]
pub mod config;
#[doc(hidden)]
pub mod services;
#[doc(hidden)]
pub mod util;

// 重新導出常用型別
pub use config::Config;
pub use errors::{Result, DailyLogError};
pub use models::record::{DailyRecord, Exchange, Figure, MarketSummary, SecurityQuote};
pub use models::watchlist::Watchlist;
pub use services::daily_service::DailyService;
pub use util::TradingDate;
