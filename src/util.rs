use chrono::{Datelike, Local, NaiveDate};
use std::fmt;
use crate::errors::{Result, DailyLogError};

/// 交易日，固定以 YYYYMMDD 八位數字輸入
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDate(NaiveDate);

impl TradingDate {
    /// 解析 `YYYYMMDD`，必須剛好 8 個數字且為合法日期
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DailyLogError::InvalidDate(format!(
                "expected YYYYMMDD, e.g. 20251031, got {:?}", input
            )));
        }

        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(TradingDate)
            .map_err(|e| DailyLogError::InvalidDate(format!("{}: {}", s, e)))
    }

    pub fn today() -> Self {
        TradingDate(Local::now().date_naive())
    }

    /// 20251031
    pub fn ymd(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// 民國日期，20251103 -> "114/11/03"
    pub fn roc(&self) -> String {
        format!("{}/{:02}/{:02}", self.0.year() - 1911, self.0.month(), self.0.day())
    }

    /// STOCK_DAY 以月份查詢，日期固定帶當月 1 日
    pub fn first_of_month(&self) -> String {
        self.0.format("%Y%m01").to_string()
    }
}

impl fmt::Display for TradingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ymd())
    }
}

// 交易所用來表示「無資料」的佔位字
const PLACEHOLDERS: [&str; 5] = ["", "-", "--", "---", "X"];

/// 去除千分位、空白與正號；不是數字就回 None
pub fn clean_number(raw: &str) -> Option<String> {
    let s: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if PLACEHOLDERS.contains(&s.as_str()) {
        return None;
    }

    let s = s.strip_prefix('+').unwrap_or(&s).to_string();
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(s),
        _ => None,
    }
}

/// JSON 儲存格轉數字字串，字串與數字都接受
pub fn number_from_value(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => clean_number(s),
        serde_json::Value::Number(n) => clean_number(&n.to_string()),
        _ => None,
    }
}

/// Best-effort string view of a JSON cell, used for labels and codes.
pub fn text_of(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
