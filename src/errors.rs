use thiserror::Error;

#[derive(Error, Debug)]
pub enum DailyLogError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 重新建立 session 後仍被擋下
    #[error("Access rejected by upstream for {url}: {reason}")]
    AccessRejected { url: String, reason: String },

    #[error("Upstream returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, DailyLogError>;

impl DailyLogError {
    /// 404 on a candidate endpoint just means "try the next one".
    pub fn is_not_found(&self) -> bool {
        matches!(self, DailyLogError::UpstreamStatus { status: 404, .. })
    }
}

// 用於把 CSV 寫入器的 into_inner 錯誤轉成 IO 錯誤
impl<W> From<csv::IntoInnerError<W>> for DailyLogError {
    fn from(e: csv::IntoInnerError<W>) -> Self {
        DailyLogError::IoError(e.into_error())
    }
}
