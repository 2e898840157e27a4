//! Shared shape handling for the exchanges' JSON tables.
//!
//! TWSE answers `{"stat", "fields", "data"}`; TPEx answers either the legacy
//! DataTables shape `{"columns": [{"sTitle"}], "aaData"}` or the newer
//! `{"tables": [{"fields", "data"}]}`. Both reduce to column titles plus rows.

use serde_json::{Map, Value};

use crate::errors::{Result, DailyLogError};
use crate::util;

const ROW_KEYS: [&str; 3] = ["aaData", "data", "items"];

#[derive(Debug)]
pub struct Table<'a> {
    pub columns: Vec<String>,
    pub rows: &'a [Value],
}

impl<'a> Table<'a> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column whose title satisfies `pred`.
    pub fn column(&self, pred: impl Fn(&str) -> bool) -> Option<usize> {
        self.columns.iter().position(|c| pred(&c.replace(' ', "")))
    }
}

pub fn as_object<'a>(value: &'a Value, report: &str) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| {
        DailyLogError::MalformedResponse(format!("{}: expected a JSON object", report))
    })
}

/// TWSE 以 stat 表示查無資料，缺少 stat 視為正常
pub fn stat_ok(obj: &Map<String, Value>) -> bool {
    match obj.get("stat") {
        Some(Value::String(s)) => s.eq_ignore_ascii_case("ok"),
        None | Some(Value::Null) => true,
        Some(_) => false,
    }
}

pub fn extract<'a>(obj: &'a Map<String, Value>, report: &str) -> Result<Table<'a>> {
    // 新版 TPEx：tables[0]
    if let Some(tables) = obj.get("tables") {
        let first = tables
            .as_array()
            .ok_or_else(|| malformed(report, "`tables` is not an array"))?
            .first();
        return match first {
            Some(t) => extract(as_object(t, report)?, report),
            None => Ok(Table { columns: Vec::new(), rows: &[] }),
        };
    }

    let columns = match obj.get("fields").or_else(|| obj.get("columns")).or_else(|| obj.get("cols")) {
        Some(Value::Array(cols)) => cols.iter().map(column_title).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(_) => return Err(malformed(report, "column list is not an array")),
    };

    let rows = match ROW_KEYS.iter().find_map(|k| obj.get(*k).filter(|v| !v.is_null())) {
        Some(Value::Array(rows)) => rows.as_slice(),
        Some(_) => return Err(malformed(report, "row list is not an array")),
        None => &[][..],
    };

    Ok(Table { columns, rows })
}

fn column_title(col: &Value) -> String {
    match col {
        Value::Object(map) => map
            .get("sTitle")
            .or_else(|| map.get("title"))
            .map(util::text_of)
            .unwrap_or_default(),
        other => util::text_of(other),
    }
}

pub fn malformed(report: &str, detail: &str) -> DailyLogError {
    DailyLogError::MalformedResponse(format!("{}: {}", report, detail))
}
