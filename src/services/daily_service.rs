use log::{info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::Result;
use crate::models::record::{DailyRecord, Exchange, SecurityQuote};
use crate::models::watchlist::Watchlist;
use crate::scrapers::base::ExchangeScraper;
use crate::scrapers::tpex::TpexScraper;
use crate::scrapers::twse::TwseScraper;
use crate::services::assembler;
use crate::util::TradingDate;

/// 每日資料服務：抓取、組成單列、寫檔
pub struct DailyService {
    config: Config,
    scrapers: Vec<Arc<dyn ExchangeScraper>>,
}

impl DailyService {
    pub fn new(config: Config, scrapers: Vec<Arc<dyn ExchangeScraper>>) -> Self {
        Self { config, scrapers }
    }

    /// Real HTTP scrapers for TWSE and TPEx, one session each.
    pub fn from_config(config: Config) -> Result<Self> {
        let scrapers: Vec<Arc<dyn ExchangeScraper>> = vec![
            Arc::new(TwseScraper::from_config(&config)?),
            Arc::new(TpexScraper::from_config(&config)?),
        ];
        Ok(Self::new(config, scrapers))
    }

    /// 取得指定交易日的完整紀錄；任何一個請求失敗整批失敗
    pub async fn fetch(&self, date: &TradingDate, watchlist: &Watchlist) -> Result<DailyRecord> {
        info!("Fetching {} securities for {}", watchlist.len(), date);

        let mut summary = None;
        let mut fetched: HashMap<(Exchange, String), SecurityQuote> = HashMap::new();

        for scraper in &self.scrapers {
            let exchange = scraper.exchange();
            if let Some(s) = scraper.fetch_market_summary(date).await? {
                summary = Some(s);
            }

            let symbols = watchlist.symbols_for(exchange);
            for quote in scraper.fetch_quotes(date, &symbols).await? {
                fetched.insert((quote.exchange, quote.symbol.clone()), quote);
            }
        }

        // 依自選股順序組合，沒抓到的留空；重複的代號各自帶同一筆資料
        let securities: Vec<SecurityQuote> = watchlist
            .entries()
            .iter()
            .map(|e| {
                fetched
                    .get(&(e.exchange, e.symbol.clone()))
                    .cloned()
                    .unwrap_or_else(|| SecurityQuote::unpublished(e.exchange, &e.symbol))
            })
            .collect();

        let record = DailyRecord {
            date: *date,
            summary: summary.unwrap_or_default(),
            securities,
        };

        let empty = record.empty_count();
        if empty > 0 {
            warn!("{} of {} fields for {} are empty (not yet published?)", empty, record.all_figures().count(), date);
        }
        Ok(record)
    }

    /// Load the watchlist, fetch, assemble and write `dailylog_<date>.csv`.
    /// Nothing is written when any step fails.
    pub async fn run(&self, date: &TradingDate) -> Result<PathBuf> {
        let watchlist = Watchlist::load(&self.config.watchlist_path)?;
        let record = self.fetch(date, &watchlist).await?;
        let text = assembler::to_csv(&record, watchlist.header(), watchlist.entries())?;

        if !self.config.output_dir.exists() {
            fs::create_dir_all(&self.config.output_dir)?;
        }
        let path = self.config.output_path(&date.ymd());
        fs::write(&path, text)?;

        info!("輸出 {}", path.display());
        Ok(path)
    }
}
