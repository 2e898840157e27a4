use std::path::PathBuf;
use std::time::Duration;

pub const TWSE_BASE_URL: &str = "https://www.twse.com.tw";
pub const TPEX_BASE_URL: &str = "https://www.tpex.org.tw";

pub struct Config {
    pub watchlist_path: PathBuf,
    pub output_dir: PathBuf,
    pub twse_base_url: String,
    pub tpex_base_url: String,
    pub request_timeout: Duration,
    pub request_interval: Duration,  // 同一交易所兩次請求的最小間隔
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            watchlist_path: PathBuf::from("watchlist.json"),
            output_dir: PathBuf::from("."),
            twse_base_url: TWSE_BASE_URL.to_string(),
            tpex_base_url: TPEX_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            request_interval: Duration::from_millis(250),
        }
    }

    pub fn with_watchlist_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.watchlist_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_twse_base_url(mut self, url: &str) -> Self {
        self.twse_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_tpex_base_url(mut self, url: &str) -> Self {
        self.tpex_base_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_request_interval(mut self, interval: Duration) -> Self {
        self.request_interval = interval;
        self
    }

    /// dailylog_<YYYYMMDD>.csv under the output directory
    pub fn output_path(&self, ymd: &str) -> PathBuf {
        self.output_dir.join(format!("dailylog_{}.csv", ymd))
    }
}
