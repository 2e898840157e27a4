#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use twse_dailylog::scrapers::base::ExchangeScraper;
use twse_dailylog::scrapers::session::{RawResponse, Transport};
use twse_dailylog::scrapers::tpex::TpexScraper;
use twse_dailylog::scrapers::twse::TwseScraper;
use twse_dailylog::{Config, DailyLogError, DailyService, Result};

pub const TWSE: &str = "https://twse.test";
pub const TPEX: &str = "https://tpex.test";

#[derive(Clone)]
pub enum Step {
    Respond(RawResponse),
    Fail,
}

struct Rule {
    pattern: String,
    steps: VecDeque<Step>,
}

/// In-memory transport: the first rule whose pattern is a substring of the
/// URL answers. Each rule plays its steps in order and repeats the last.
#[derive(Default)]
pub struct ScriptedTransport {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<String>>,
    resets: AtomicUsize,
    establishes: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, steps: Vec<Step>) -> Self {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            steps: steps.into(),
        });
        self
    }

    pub fn calls_matching(&self, pattern: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| u.contains(pattern)).count()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn establishes(&self) -> usize {
        self.establishes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn establish(&self, _seed_url: &str) -> Result<()> {
        self.establishes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, url: &str, _referer: &str) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(url.to_string());
        let step = {
            let mut rules = self.rules.lock().unwrap();
            rules.iter_mut().find(|r| url.contains(&r.pattern)).and_then(|rule| {
                if rule.steps.len() > 1 {
                    rule.steps.pop_front()
                } else {
                    rule.steps.front().cloned()
                }
            })
        };

        match step {
            Some(Step::Respond(r)) => Ok(r),
            Some(Step::Fail) => Err(DailyLogError::IoError(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
            None => Ok(status(404)),
        }
    }

    fn reset(&self) -> Result<()> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn json_body(value: Value) -> RawResponse {
    RawResponse {
        status: 200,
        location: None,
        content_type: Some("application/json; charset=utf-8".to_string()),
        body: value.to_string(),
    }
}

pub fn redirect(location: &str) -> RawResponse {
    RawResponse {
        status: 302,
        location: Some(location.to_string()),
        content_type: Some("text/html".to_string()),
        body: String::new(),
    }
}

pub fn html() -> RawResponse {
    RawResponse {
        status: 200,
        location: None,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: "<html><body>請稍候</body></html>".to_string(),
    }
}

pub fn status(code: u16) -> RawResponse {
    RawResponse {
        status: code,
        location: None,
        content_type: None,
        body: String::new(),
    }
}

pub fn ok(value: Value) -> Vec<Step> {
    vec![Step::Respond(json_body(value))]
}

// ---- fixtures for 2025-10-31 (民國 114/10/31) ----

pub fn bfi82u() -> Value {
    json!({
        "stat": "OK",
        "fields": ["單位名稱", "買進金額", "賣出金額", "買賣差額"],
        "data": [
            ["自營商(自行買賣)", "3,000", "2,000", "1,000"],
            ["自營商(避險)", "5,000", "6,500", "-1,500"],
            ["投信", "7,000", "4,000", "3,000"],
            ["外資及陸資(不含外資自營商)", "100,000", "90,000", "10,000"],
            ["外資自營商", "10", "20", "-10"],
            ["合計", "115,000", "102,500", "12,500"]
        ]
    })
}

pub fn t86() -> Value {
    json!({
        "stat": "OK",
        "fields": [
            "證券代號", "證券名稱",
            "外陸資買進股數(不含外資自營商)", "外陸資賣出股數(不含外資自營商)", "外陸資買賣超股數(不含外資自營商)",
            "投信買進股數", "投信賣出股數", "投信買賣超股數",
            "自營商買賣超股數", "三大法人買賣超股數"
        ],
        "data": [
            ["2330", "台積電", "9", "8", "1,200", "5", "4", "300", "-50", "1,450"],
            ["2317", "鴻海", "9", "8", "-2,000", "5", "4", "10", "20", "-1,970"]
        ]
    })
}

pub fn stock_day(close_1031: &str) -> Value {
    json!({
        "stat": "OK",
        "fields": ["日期", "成交股數", "成交金額", "開盤價", "最高價", "最低價", "收盤價", "漲跌價差", "成交筆數"],
        "data": [
            ["114/10/30", "1", "1", "1", "1", "1", "1.00", "0.00", "1"],
            ["114/10/31", "1", "1", "1", "1", "1", close_1031, "+1.00", "1"]
        ]
    })
}

pub fn tpex_close(code: &str, close: &str) -> Value {
    json!({
        "columns": [{"sTitle": "代號"}, {"sTitle": "名稱"}, {"sTitle": "收盤"}],
        "aaData": [[code, "名稱", close]]
    })
}

pub fn tpex_3insti() -> Value {
    json!({
        "aaData": [
            ["3293", "鈊象", "1", "2", "3", "4"],
            ["6763", "綠界科技", "5", "6", "7", "18"]
        ]
    })
}

pub fn no_data() -> Value {
    json!({"stat": "很抱歉，沒有符合條件的資料!"})
}

/// TWSE transport answering every report for 2330, 2317.
pub fn twse_published() -> ScriptedTransport {
    ScriptedTransport::new()
        .on("/rwd/zh/fund/BFI82U?", ok(bfi82u()))
        .on("/rwd/zh/fund/T86?", ok(t86()))
        .on("stockNo=2330", ok(stock_day("1,460.00")))
        .on("stockNo=2317", ok(stock_day("228.50")))
}

/// TPEx transport answering every report for 3293, 6763.
pub fn tpex_published() -> ScriptedTransport {
    ScriptedTransport::new()
        .on("s=3293", ok(tpex_close("3293", "812.00")))
        .on("s=6763", ok(tpex_close("6763", "55.10")))
        .on("3itrade_result.php", ok(tpex_3insti()))
}

pub fn test_config() -> Config {
    Config::new()
        .with_twse_base_url(TWSE)
        .with_tpex_base_url(TPEX)
        .with_request_interval(Duration::ZERO)
}

pub fn service(config: Config, twse: Arc<ScriptedTransport>, tpex: Arc<ScriptedTransport>) -> DailyService {
    let scrapers: Vec<Arc<dyn ExchangeScraper>> = vec![
        Arc::new(TwseScraper::new(TWSE, twse, &config)),
        Arc::new(TpexScraper::new(TPEX, tpex, &config)),
    ];
    DailyService::new(config, scrapers)
}
