use httpmock::prelude::*;
use serde_json::json;
use std::fs;
use std::time::Duration;

use twse_dailylog::{Config, DailyLogError, DailyService, TradingDate};

fn config(server: &MockServer, dir: &std::path::Path) -> Config {
    let watchlist = dir.join("watchlist.json");
    fs::write(&watchlist, r#"{"twse": ["2330"], "tpex": ["6763"]}"#).unwrap();
    Config::new()
        .with_watchlist_path(watchlist)
        .with_output_dir(dir)
        .with_twse_base_url(&server.base_url())
        .with_tpex_base_url(&server.base_url())
        .with_request_interval(Duration::ZERO)
        .with_request_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn full_run_against_mock_exchanges() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/rwd/zh/fund/BFI82U").query_param("date", "20251031");
            then.status(200).json_body(json!({
                "stat": "OK",
                "fields": ["單位名稱", "買進金額", "賣出金額", "買賣差額"],
                "data": [
                    ["自營商(自行買賣)", "1", "2", "-1"],
                    ["自營商(避險)", "3", "4", "-1"],
                    ["投信", "5", "6", "-1"],
                    ["外資及陸資(不含外資自營商)", "7", "8", "-1"],
                    ["合計", "16", "20", "-4"]
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rwd/zh/fund/T86").query_param("selectType", "ALL");
            then.status(200).json_body(json!({
                "stat": "OK",
                "fields": ["證券代號", "證券名稱", "外陸資買賣超股數(不含外資自營商)", "投信買賣超股數", "自營商買賣超股數", "三大法人買賣超股數"],
                "data": [["2330", "台積電", "1,000", "20", "-3", "1,017"]]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rwd/zh/afterTrading/STOCK_DAY")
                .query_param("date", "20251001")
                .query_param("stockNo", "2330");
            then.status(200).json_body(json!({
                "stat": "OK",
                "fields": ["日期", "收盤價"],
                "data": [["114/10/30", "1,450.00"], ["114/10/31", "1,460.00"]]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/web/stock/aftertrading/daily_close_quotes/stk_quote_result.php")
                .query_param("d", "114/10/31")
                .query_param("s", "6763");
            then.status(200).json_body(json!({
                "date": "20251031",
                "aaData": [["6763", "綠界科技", "55.10"]]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/web/stock/3insti/daily_trade/3itrade_result.php");
            then.status(200).json_body(json!({
                "aaData": [["6763", "綠界科技", "10", "20", "30", "60"]]
            }));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = DailyService::from_config(config(&server, dir.path())).unwrap();
    let date = TradingDate::parse("20251031").unwrap();

    let path = service.run(&date).await.unwrap();
    let text = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Date(YYYYMMDD),"));
    assert_eq!(
        lines[1],
        "20251031,7,8,-1,5,6,-1,4,6,-2,-4,1460.00,1000,20,-3,1017,55.10,10,20,30,60"
    );
}

#[tokio::test]
async fn persistent_redirect_fails_without_output() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method(GET).path("/rwd/zh/fund/BFI82U").query_param("response", "json");
            then.status(302).header("Location", "/blocked");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/blocked");
            then.status(200)
                .header("Content-Type", "text/html; charset=utf-8")
                .body("<html>請稍候</html>");
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let service = DailyService::from_config(config(&server, dir.path())).unwrap();
    let date = TradingDate::parse("20251031").unwrap();

    let err = service.run(&date).await.unwrap_err();
    assert!(matches!(err, DailyLogError::AccessRejected { .. }), "got {err:?}");
    assert!(!dir.path().join("dailylog_20251031.csv").exists());
}
