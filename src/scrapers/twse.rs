use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::{Result, DailyLogError};
use crate::models::record::{Exchange, Figure, InstitutionalNet, MarketSummary, SecurityQuote, TradeFlow};
use crate::scrapers::base::ExchangeScraper;
use crate::scrapers::session::{HttpTransport, Session, Transport};
use crate::scrapers::table;
use crate::util::{self, TradingDate};

const SEED_PATH: &str = "/rwd/zh/fund/BFI82U";
const T86_REFERER_PATH: &str = "/rwd/zh/fund/T86";
const STOCK_DAY_REFERER_PATH: &str = "/rwd/zh/afterTrading/stockDay";

/// 臺灣證券交易所（上市）
pub struct TwseScraper {
    base_url: String,
    session: Session,
}

impl TwseScraper {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, config: &Config) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let session = Session::new(transport, &format!("{}{}", base_url, SEED_PATH), config.request_interval);
        Self { base_url, session }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.request_timeout)?);
        Ok(Self::new(&config.twse_base_url, transport, config))
    }

    fn market_summary_url(&self, date: &TradingDate) -> String {
        format!("{}/rwd/zh/fund/BFI82U?date={}&response=json", self.base_url, date.ymd())
    }

    fn institutional_url(&self, date: &TradingDate) -> String {
        format!("{}/rwd/zh/fund/T86?date={}&selectType=ALL&response=json", self.base_url, date.ymd())
    }

    fn stock_day_url(&self, date: &TradingDate, symbol: &str) -> String {
        format!(
            "{}/rwd/zh/afterTrading/STOCK_DAY?response=json&date={}&stockNo={}",
            self.base_url,
            date.first_of_month(),
            symbol
        )
    }

    fn referer(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl ExchangeScraper for TwseScraper {
    fn exchange(&self) -> Exchange {
        Exchange::Twse
    }

    async fn fetch_market_summary(&self, date: &TradingDate) -> Result<Option<MarketSummary>> {
        info!("獲取上市三大法人買賣金額 {}", date);
        let json = self
            .session
            .get_json(&self.market_summary_url(date), self.session.seed_url())
            .await?;
        Ok(Some(parse_market_summary(&json)?))
    }

    async fn fetch_quotes(&self, date: &TradingDate, symbols: &[String]) -> Result<Vec<SecurityQuote>> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        info!("獲取上市個股三大法人 {}", date);
        let json = self
            .session
            .get_json(&self.institutional_url(date), &self.referer(T86_REFERER_PATH))
            .await?;
        let institutional = parse_institutional(&json)?;
        debug!("T86 rows: {}", institutional.len());

        let mut quotes = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            let json = self
                .session
                .get_json(&self.stock_day_url(date, symbol), &self.referer(STOCK_DAY_REFERER_PATH))
                .await?;
            let close = parse_close_for_date(&json, date)?;
            if close.is_empty() {
                warn!("{} {} has no close for {}", self.exchange(), symbol, date);
            }

            quotes.push(SecurityQuote {
                exchange: Exchange::Twse,
                symbol: symbol.clone(),
                close,
                institutional: institutional.get(symbol).cloned().unwrap_or_default(),
            });
        }

        Ok(quotes)
    }
}

fn row_cells<'a>(row: &'a Value, report: &str) -> Result<&'a [Value]> {
    row.as_array()
        .map(|r| r.as_slice())
        .ok_or_else(|| table::malformed(report, "row is not an array"))
}

#[derive(Default)]
struct DealerParts {
    buy: Option<f64>,
    sell: Option<f64>,
    net: Option<f64>,
}

impl DealerParts {
    fn add(slot: &mut Option<f64>, figure: &Figure) {
        if let Some(v) = figure.as_f64() {
            *slot = Some(slot.unwrap_or(0.0) + v);
        }
    }

    fn push(&mut self, flow: &TradeFlow) {
        Self::add(&mut self.buy, &flow.buy);
        Self::add(&mut self.sell, &flow.sell);
        Self::add(&mut self.net, &flow.net);
    }

    fn is_empty(&self) -> bool {
        self.buy.is_none() && self.sell.is_none() && self.net.is_none()
    }

    fn into_flow(self) -> TradeFlow {
        let figure = |v: Option<f64>| v.map(Figure::from_f64).unwrap_or_default();
        TradeFlow {
            buy: figure(self.buy),
            sell: figure(self.sell),
            net: figure(self.net),
        }
    }
}

/// 解析 BFI82U 三大法人買賣金額統計表
pub fn parse_market_summary(json: &Value) -> Result<MarketSummary> {
    const REPORT: &str = "BFI82U";
    let obj = table::as_object(json, REPORT)?;
    let mut summary = MarketSummary::default();
    if !table::stat_ok(obj) {
        return Ok(summary);
    }

    let mut dealer_total: Option<TradeFlow> = None;
    let mut dealer_parts = DealerParts::default();

    for row in table::extract(obj, REPORT)?.rows {
        let cells = row_cells(row, REPORT)?;
        if cells.len() < 4 {
            return Err(table::malformed(REPORT, "row has fewer than 4 cells"));
        }

        let label = util::text_of(&cells[0]).replace(' ', "");
        let flow = TradeFlow {
            buy: Figure::from_value(&cells[1]),
            sell: Figure::from_value(&cells[2]),
            net: Figure::from_value(&cells[3]),
        };

        // 外資自營商併入自營商小計
        if label.starts_with("外資") && !label.starts_with("外資自營商") && !label.contains("合計") {
            summary.foreign = flow;
        } else if label.contains("投信") && !label.contains("合計") {
            summary.trust = flow;
        } else if label.contains("自營商") {
            if label.contains("合計") {
                dealer_total = Some(flow);
            } else {
                dealer_parts.push(&flow);
            }
        } else if label.starts_with("合計") || label.contains("三大法人") {
            summary.total_net = flow.net;
        }
    }

    summary.dealer = match dealer_total {
        Some(total) => total,
        None if !dealer_parts.is_empty() => dealer_parts.into_flow(),
        None => TradeFlow::default(),
    };

    Ok(summary)
}

/// T86 個股三大法人買賣超，依證券代號建表
pub fn parse_institutional(json: &Value) -> Result<HashMap<String, InstitutionalNet>> {
    const REPORT: &str = "T86";
    let obj = table::as_object(json, REPORT)?;
    let mut out = HashMap::new();
    if !table::stat_ok(obj) {
        return Ok(out);
    }

    let t = table::extract(obj, REPORT)?;
    // 欄名找不到時退回固定欄位
    let foreign = t
        .column(|c| c.starts_with("外陸資買賣超") || (c.contains("外資") && c.contains("買賣超") && !c.contains("自營商")))
        .unwrap_or(2);
    let trust = t.column(|c| c.starts_with("投信買賣超")).unwrap_or(3);
    let dealer = t.column(|c| c == "自營商買賣超股數").unwrap_or(4);
    let total = t.column(|c| c.starts_with("三大法人買賣超")).unwrap_or(5);

    for row in t.rows {
        let cells = row_cells(row, REPORT)?;
        let Some(code) = cells.first().map(util::text_of).filter(|c| !c.is_empty()) else {
            continue;
        };
        let figure = |idx: usize| cells.get(idx).map(Figure::from_value).unwrap_or_default();

        out.insert(
            code,
            InstitutionalNet {
                foreign: figure(foreign),
                trust: figure(trust),
                dealer: figure(dealer),
                total: figure(total),
            },
        );
    }

    Ok(out)
}

/// STOCK_DAY 回傳整月資料，取出指定日期那一列的收盤價
pub fn parse_close_for_date(json: &Value, date: &TradingDate) -> Result<Figure> {
    const REPORT: &str = "STOCK_DAY";
    let obj = table::as_object(json, REPORT)?;
    if !table::stat_ok(obj) {
        return Ok(Figure::empty());
    }

    let t = table::extract(obj, REPORT)?;
    if t.is_empty() {
        return Ok(Figure::empty());
    }

    let (Some(date_idx), Some(close_idx)) = (t.column(|c| c == "日期"), t.column(|c| c == "收盤價")) else {
        return Err(DailyLogError::MalformedResponse(format!(
            "{}: missing 日期/收盤價 columns in {:?}",
            REPORT, t.columns
        )));
    };

    let roc = date.roc();
    for row in t.rows {
        let cells = row_cells(row, REPORT)?;
        if cells.get(date_idx).map(util::text_of).as_deref() == Some(roc.as_str()) {
            return Ok(cells.get(close_idx).map(Figure::from_value).unwrap_or_default());
        }
    }

    Ok(Figure::empty())
}
