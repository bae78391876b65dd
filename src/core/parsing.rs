//! RS.ge 回傳與使用者輸入的寬鬆轉換：日期、金額、TIN。

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Upstream date-time format used for every date parameter we send.
pub const UPSTREAM_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// 解析日期時間；只有日期時視為當天 00:00:00
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    // 帶時區的 RFC 3339 直接取當地時間
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    parse_date(trimmed).and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Date-only input ("2024-01-05", "5.1.2024", "05/01/2024").
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

pub fn format_upstream(dt: &NaiveDateTime) -> String {
    dt.format(UPSTREAM_DATETIME_FORMAT).to_string()
}

/// 解析金額，支援 "1 234,56"、"1,234.56"、"12.5 ₾" 等格式
pub fn parse_amount(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amount_str(s),
        _ => None,
    }
}

pub fn parse_amount_str(input: &str) -> Option<f64> {
    let cleaned: String = input
        .trim()
        .trim_end_matches("GEL")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '₾' && *c != '\'')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // 兩種分隔符都有時，最後出現者為小數點
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) if cleaned.matches(',').count() == 1 => cleaned.replace(',', "."),
        (Some(_), None) => cleaned.replace(',', ""),
        _ => cleaned,
    };

    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 喬治亞 TIN：公司 9 碼、個人 11 碼，全為數字
pub fn is_valid_tin(input: &str) -> bool {
    let tin = input.trim();
    matches!(tin.len(), 9 | 11) && tin.bytes().all(|b| b.is_ascii_digit())
}

/// Scalar JSON value as trimmed text; numbers are rendered, empty strings become `None`.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub fn value_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
