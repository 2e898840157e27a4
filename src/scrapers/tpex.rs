use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::Result;
use crate::models::record::{Exchange, Figure, InstitutionalNet, SecurityQuote};
use crate::scrapers::base::ExchangeScraper;
use crate::scrapers::session::{HttpTransport, Session, Transport};
use crate::scrapers::table::{self, Table};
use crate::util::{self, TradingDate};

const SEED_PATH: &str = "/web/stock/aftertrading/daily_trading_info/st43.php?l=zh-tw";
const INSTITUTIONAL_REFERER_PATH: &str = "/web/stock/3insti/daily_trade/3itrade.php?l=zh-tw";
const INSTITUTIONAL_PATHS: [&str; 2] = [
    "/web/stock/3insti/daily_trade/3itrade_result.php",
    "/web/stock/3insti/daily_trade/3itrade_hedge_result.php",
];

const CLOSE_TITLES: [&str; 4] = ["收盤價", "收盤", "Close", "ClosingPrice"];

/// 證券櫃檯買賣中心（上櫃）
pub struct TpexScraper {
    base_url: String,
    session: Session,
}

impl TpexScraper {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, config: &Config) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let session = Session::new(transport, &format!("{}{}", base_url, SEED_PATH), config.request_interval);
        Self { base_url, session }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
        Ok(Self::new(&config.tpex_base_url, transport, config))
    }

    fn close_url(&self, date: &TradingDate, symbol: &str) -> String {
        format!(
            "{}/web/stock/aftertrading/daily_close_quotes/stk_quote_result.php?l=zh-tw&d={}&s={}",
            self.base_url,
            date.roc(),
            symbol
        )
    }

    fn institutional_candidates(&self, date: &TradingDate) -> Vec<String> {
        INSTITUTIONAL_PATHS
            .iter()
            .map(|path| format!("{}{}?l=zh-tw&se=AL&t=D&d={}", self.base_url, path, date.roc()))
            .collect()
    }

    /// 依序嘗試候選端點，第一個有資料的勝出；全部沒有資料視為尚未公布
    async fn fetch_first_with_rows(&self, urls: &[String], referer: &str) -> Result<Option<Value>> {
        for url in urls {
            let json = match self.session.get_json(url, referer).await {
                Ok(json) => json,
                Err(e) if e.is_not_found() => {
                    debug!("{} not found, trying next candidate", url);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let obj = table::as_object(&json, "3insti")?;
            if !table::extract(obj, "3insti")?.is_empty() {
                return Ok(Some(json));
            }
            debug!("{} has no rows", url);
        }
        Ok(None)
    }
}

#[async_trait]
impl ExchangeScraper for TpexScraper {
    fn exchange(&self) -> Exchange {
        Exchange::Tpex
    }

    async fn fetch_quotes(&self, date: &TradingDate, symbols: &[String]) -> Result<Vec<SecurityQuote>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            info!("獲取上櫃 {} 收盤價 {}", symbol, date);
            let json = self
                .session
                .get_json(&self.close_url(date, symbol), self.session.seed_url())
                .await?;
            let close = parse_close(&json, date)?;
            if close.is_empty() {
                warn!("{} {} has no close for {}", self.exchange(), symbol, date);
            }
            quotes.push(SecurityQuote {
                exchange: Exchange::Tpex,
                symbol: symbol.clone(),
                close,
                institutional: InstitutionalNet::default(),
            });
        }

        info!("獲取上櫃三大法人 {}", date);
        let referer = format!("{}{}", self.base_url, INSTITUTIONAL_REFERER_PATH);
        if let Some(json) = self
            .fetch_first_with_rows(&self.institutional_candidates(date), &referer)
            .await?
        {
            let institutional = parse_institutional(&json)?;
            for quote in quotes.iter_mut() {
                if let Some(net) = institutional.get(&quote.symbol) {
                    quote.institutional = net.clone();
                }
            }
        } else {
            warn!("TPEx institutional report for {} not published", date);
        }

        Ok(quotes)
    }
}

fn is_security_code(s: &str) -> bool {
    (4..=6).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// 收盤價：依欄名找收盤欄；單列直接用，多列取最後一列
pub fn parse_close(json: &Value, date: &TradingDate) -> Result<Figure> {
    const REPORT: &str = "stk_quote_result";
    let obj = table::as_object(json, REPORT)?;

    // 回傳帶日期且不是要求的那天，代表尚未公布
    if let Some(reported) = obj.get("date").map(util::text_of) {
        if reported.len() == 8 && reported.bytes().all(|b| b.is_ascii_digit()) && reported != date.ymd() {
            debug!("TPEx answered for {} instead of {}", reported, date);
            return Ok(Figure::empty());
        }
    }

    let t = table::extract(obj, REPORT)?;
    let row = match t.rows {
        [] => return Ok(Figure::empty()),
        [only] => only,
        [.., last] => last,
    };

    match row {
        Value::Array(cells) => Ok(close_from_cells(&t, cells)),
        Value::Object(map) => Ok(first_figure(map, &CLOSE_TITLES)),
        _ => Err(table::malformed(REPORT, "row is neither an array nor an object")),
    }
}

fn close_from_cells(t: &Table<'_>, cells: &[Value]) -> Figure {
    if let Some(idx) = t.column(|c| CLOSE_TITLES.iter().any(|k| c.contains(k))) {
        if let Some(cell) = cells.get(idx) {
            return Figure::from_value(cell);
        }
    }

    // 找不到收盤欄時，退而求其次取列中最後一個像價格的數字
    cells
        .iter()
        .rev()
        .map(Figure::from_value)
        .find(|f| f.as_f64().is_some_and(|v| v >= 0.0))
        .unwrap_or_default()
}

fn first_figure(map: &Map<String, Value>, keys: &[&str]) -> Figure {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .map(Figure::from_value)
        .find(|f| !f.is_empty())
        .unwrap_or_default()
}

/// 上櫃三大法人：陣列列取最後四個數字（外資、投信、自營商、合計）
pub fn parse_institutional(json: &Value) -> Result<HashMap<String, InstitutionalNet>> {
    const REPORT: &str = "3insti";
    let obj = table::as_object(json, REPORT)?;
    let mut out = HashMap::new();

    for row in table::extract(obj, REPORT)?.rows {
        match row {
            Value::Array(cells) => {
                let Some(code) = cells.iter().map(util::text_of).find(|s| is_security_code(s)) else {
                    continue;
                };
                let nums: Vec<Figure> = cells
                    .iter()
                    .map(Figure::from_value)
                    .filter(|f| !f.is_empty())
                    .collect();
                if let [.., foreign, trust, dealer, total] = nums.as_slice() {
                    out.insert(
                        code,
                        InstitutionalNet {
                            foreign: foreign.clone(),
                            trust: trust.clone(),
                            dealer: dealer.clone(),
                            total: total.clone(),
                        },
                    );
                }
            }
            Value::Object(map) => {
                let code = ["證券代號", "股票代號", "Code", "code"]
                    .iter()
                    .filter_map(|k| map.get(*k))
                    .map(util::text_of)
                    .find(|s| !s.is_empty());
                let Some(code) = code else {
                    continue;
                };
                out.insert(
                    code,
                    InstitutionalNet {
                        foreign: first_figure(map, &["外資買賣超股數", "外資", "Foreign", "frgn_net"]),
                        trust: first_figure(map, &["投信買賣超股數", "投信", "IT", "inv_trust_net"]),
                        dealer: first_figure(map, &["自營商買賣超股數", "自營商", "Dealer", "dealer_net"]),
                        total: first_figure(map, &["三大法人買賣超股數", "合計", "Total", "sum"]),
                    },
                );
            }
            _ => return Err(table::malformed(REPORT, "row is neither an array nor an object")),
        }
    }

    Ok(out)
}
