use log::{info, warn};
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;

use crate::errors::{Result, DailyLogError};
use crate::models::record::Exchange;

// 預設自選股，可用 watchlist.json 覆寫
pub const DEFAULT_TWSE: [&str; 7] = ["2258", "2308", "2317", "2330", "2357", "2454", "2753"];
pub const DEFAULT_TPEX: [&str; 2] = ["3293", "6763"];

const DEFAULT_DATE_LABEL: &str = "Date(YYYYMMDD)";
const DEFAULT_SUMMARY_LABELS: [&str; 10] = [
    "外資買進金額", "外資賣出金額", "外資買賣超",
    "投信買進金額", "投信賣出金額", "投信買賣超",
    "自營商買進金額", "自營商賣出金額", "自營商買賣超",
    "三大法人合計買賣超",
];
const DEFAULT_SECURITY_SUFFIXES: [&str; 5] = ["收盤價", "外資張", "投信張", "自營商張", "合計張"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub exchange: Exchange,
    pub symbol: String,
}

/// 輸出表頭，欄名由試算表決定，所以放在設定檔
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLabels {
    pub date: String,
    pub summary: Vec<String>,
    pub per_security: Vec<String>,
}

impl Default for HeaderLabels {
    fn default() -> Self {
        Self {
            date: DEFAULT_DATE_LABEL.to_string(),
            summary: DEFAULT_SUMMARY_LABELS.iter().map(|s| s.to_string()).collect(),
            per_security: DEFAULT_SECURITY_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Ordered list of securities to fetch: listed (TWSE) first, then OTC (TPEx).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watchlist {
    entries: Vec<WatchEntry>,
    header: HeaderLabels,
}

#[derive(Debug, Default, Deserialize)]
struct WatchlistFile {
    #[serde(default, deserialize_with = "symbols")]
    twse: Vec<String>,
    #[serde(default, deserialize_with = "symbols")]
    tpex: Vec<String>,
    #[serde(default)]
    header: Option<HeaderFile>,
}

#[derive(Debug, Default, Deserialize)]
struct HeaderFile {
    date: Option<String>,
    summary: Option<Vec<String>>,
    per_security: Option<Vec<String>>,
}

// 代號可以寫成字串或數字
fn symbols<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Symbol {
        Text(String),
        Number(u64),
    }

    let raw: Vec<Symbol> = Vec::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|s| match s {
            Symbol::Text(t) => t.trim().to_string(),
            Symbol::Number(n) => n.to_string(),
        })
        .collect())
}

fn defaults(symbols: &[&str]) -> Vec<String> {
    symbols.iter().map(|s| s.to_string()).collect()
}

impl Watchlist {
    pub fn new(twse: &[&str], tpex: &[&str]) -> Result<Self> {
        Self::from_parts(
            twse.iter().map(|s| s.to_string()).collect(),
            tpex.iter().map(|s| s.to_string()).collect(),
            HeaderLabels::default(),
        )
    }

    pub fn from_parts(twse: Vec<String>, tpex: Vec<String>, header: HeaderLabels) -> Result<Self> {
        if header.summary.len() != DEFAULT_SUMMARY_LABELS.len() {
            return Err(DailyLogError::ConfigError(format!(
                "header.summary needs {} labels, got {}",
                DEFAULT_SUMMARY_LABELS.len(),
                header.summary.len()
            )));
        }
        if header.per_security.len() != DEFAULT_SECURITY_SUFFIXES.len() {
            return Err(DailyLogError::ConfigError(format!(
                "header.per_security needs {} labels, got {}",
                DEFAULT_SECURITY_SUFFIXES.len(),
                header.per_security.len()
            )));
        }

        let entries: Vec<WatchEntry> = twse
            .into_iter()
            .map(|symbol| WatchEntry { exchange: Exchange::Twse, symbol })
            .chain(tpex.into_iter().map(|symbol| WatchEntry { exchange: Exchange::Tpex, symbol }))
            .filter(|e| !e.symbol.is_empty())
            .collect();

        if entries.is_empty() {
            return Err(DailyLogError::ConfigError("watchlist is empty".to_string()));
        }

        Ok(Self { entries, header })
    }

    pub fn default_list() -> Self {
        Self {
            entries: defaults(&DEFAULT_TWSE)
                .into_iter()
                .map(|symbol| WatchEntry { exchange: Exchange::Twse, symbol })
                .chain(defaults(&DEFAULT_TPEX).into_iter().map(|symbol| WatchEntry { exchange: Exchange::Tpex, symbol }))
                .collect(),
            header: HeaderLabels::default(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let file: WatchlistFile = serde_json::from_str(text)?;
        let mut header = HeaderLabels::default();
        if let Some(h) = file.header {
            if let Some(date) = h.date {
                header.date = date;
            }
            if let Some(summary) = h.summary {
                header.summary = summary;
            }
            if let Some(per_security) = h.per_security {
                header.per_security = per_security;
            }
        }
        // 缺少或空白的交易所沿用預設清單
        let twse = if file.twse.is_empty() { defaults(&DEFAULT_TWSE) } else { file.twse };
        let tpex = if file.tpex.is_empty() { defaults(&DEFAULT_TPEX) } else { file.tpex };
        Self::from_parts(twse, tpex, header)
    }

    /// 讀取設定檔；檔案不存在時使用預設清單，存在但格式錯誤則報錯
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("{} not found, using built-in watchlist", path.display());
            return Ok(Self::default_list());
        }

        let text = fs::read_to_string(path)?;
        let list = Self::from_json(&text).map_err(|e| {
            DailyLogError::ConfigError(format!("{}: {}", path.display(), e))
        })?;
        info!("Loaded {} securities from {}", list.len(), path.display());
        Ok(list)
    }

    pub fn entries(&self) -> &[WatchEntry] {
        &self.entries
    }

    pub fn header(&self) -> &HeaderLabels {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbols_for(&self, exchange: Exchange) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.exchange == exchange)
            .map(|e| e.symbol.clone())
            .collect()
    }
}
