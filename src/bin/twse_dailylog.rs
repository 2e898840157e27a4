use twse_dailylog::{Config, DailyService, TradingDate};

use anyhow::Context;
use clap::{Arg, Command};
use log::{error, info};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init();

    let matches = Command::new("twse_dailylog")
        .version(env!("CARGO_PKG_VERSION"))
        .about("抓取台股上市、上櫃每日資料，輸出單列 CSV（含表頭）")
        .arg(
            Arg::new("date")
                .value_name("YYYYMMDD")
                .help("Trading date to fetch, defaults to today")
                .index(1),
        )
        .arg(
            Arg::new("watchlist")
                .short('w')
                .long("watchlist")
                .value_name("PATH")
                .help("Watchlist JSON file")
                .takes_value(true)
                .default_value("watchlist.json"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Directory for dailylog_<date>.csv")
                .takes_value(true)
                .default_value("."),
        )
        .arg(
            Arg::new("twse-url")
                .long("twse-url")
                .value_name("URL")
                .help("TWSE base URL")
                .takes_value(true)
                .default_value(twse_dailylog::config::TWSE_BASE_URL),
        )
        .arg(
            Arg::new("tpex-url")
                .long("tpex-url")
                .value_name("URL")
                .help("TPEx base URL")
                .takes_value(true)
                .default_value(twse_dailylog::config::TPEX_BASE_URL),
        )
        .arg(
            Arg::new("interval-ms")
                .long("interval-ms")
                .value_name("MS")
                .help("Minimum delay between requests to the same exchange")
                .takes_value(true)
                .default_value("250"),
        )
        .arg(
            Arg::new("timeout-secs")
                .long("timeout-secs")
                .value_name("SECS")
                .help("Per-request timeout")
                .takes_value(true)
                .default_value("30"),
        )
        .get_matches();

    let date = match matches.value_of("date") {
        Some(s) => TradingDate::parse(s).context("請輸入 YYYYMMDD，例如：20251031")?,
        None => TradingDate::today(),
    };

    let interval_ms = matches
        .value_of("interval-ms")
        .unwrap_or("250")
        .parse::<u64>()
        .context("--interval-ms must be a whole number")?;
    let timeout_secs = matches
        .value_of("timeout-secs")
        .unwrap_or("30")
        .parse::<u64>()
        .context("--timeout-secs must be a whole number")?;

    let config = Config::new()
        .with_watchlist_path(matches.value_of("watchlist").unwrap_or("watchlist.json"))
        .with_output_dir(matches.value_of("output-dir").unwrap_or("."))
        .with_twse_base_url(matches.value_of("twse-url").unwrap_or(twse_dailylog::config::TWSE_BASE_URL))
        .with_tpex_base_url(matches.value_of("tpex-url").unwrap_or(twse_dailylog::config::TPEX_BASE_URL))
        .with_request_interval(Duration::from_millis(interval_ms))
        .with_request_timeout(Duration::from_secs(timeout_secs));

    info!("Fetching daily log for {}", date);
    let service = DailyService::from_config(config)?;
    match service.run(&date).await {
        Ok(path) => {
            println!("輸出 {}", path.display());
            Ok(())
        }
        Err(e) => {
            error!("Daily log for {} failed: {}", date, e);
            Err(e.into())
        }
    }
}
