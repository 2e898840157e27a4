use crate::errors::Result;
use crate::models::record::DailyRecord;
use crate::models::watchlist::{HeaderLabels, WatchEntry};

/// 表頭：日期、10 欄大盤法人、每檔 5 欄
pub fn header(labels: &HeaderLabels, entries: &[WatchEntry]) -> Vec<String> {
    let mut columns = Vec::with_capacity(1 + labels.summary.len() + entries.len() * labels.per_security.len());
    columns.push(labels.date.clone());
    columns.extend(labels.summary.iter().cloned());
    for entry in entries {
        columns.extend(
            labels
                .per_security
                .iter()
                .map(|suffix| format!("{}_{}", entry.symbol, suffix)),
        );
    }
    columns
}

/// Data row in header order; missing figures become empty cells.
pub fn row(record: &DailyRecord) -> Vec<String> {
    std::iter::once(record.date.ymd())
        .chain(record.all_figures().map(|f| f.to_string()))
        .collect()
}

/// Header line plus one data line, ready to write.
pub fn to_csv(record: &DailyRecord, labels: &HeaderLabels, entries: &[WatchEntry]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(header(labels, entries))?;
    wtr.write_record(row(record))?;
    let bytes = wtr.into_inner()?;
    // 欄位都來自 String，必為合法 UTF-8
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
