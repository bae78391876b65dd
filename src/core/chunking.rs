use crate::core::parsing::{format_upstream, parse_datetime};
use chrono::{Duration, NaiveDateTime};
use serde_json::{Map, Value};

pub const DEFAULT_CHUNK_HOURS: i64 = 72;

/// Date-range parameter pairs the service filters on, in the order we try them.
pub const DATE_RANGE_PARAMS: &[(&str, &str)] = &[
    ("create_date_s", "create_date_e"),
    ("begin_date_s", "begin_date_e"),
    ("delivery_date_s", "delivery_date_e"),
    ("close_date_s", "close_date_e"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start_param: &'static str,
    pub end_param: &'static str,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// 找出第一組兩端都能解析的日期區間參數
pub fn find_date_range(params: &Map<String, Value>) -> Option<DateRange> {
    DATE_RANGE_PARAMS.iter().find_map(|&(start_param, end_param)| {
        let start = params.get(start_param)?.as_str().and_then(parse_datetime)?;
        let end = params.get(end_param)?.as_str().and_then(parse_datetime)?;
        (start <= end).then_some(DateRange {
            start_param,
            end_param,
            start,
            end,
        })
    })
}

/// Split `[start, end]` into contiguous windows no longer than `hours`.
///
/// Each window but the last ends one second before the next begins, so
/// second-precision timestamps fall into exactly one window.
pub fn split_windows(start: NaiveDateTime, end: NaiveDateTime, hours: i64) -> Vec<Window> {
    let step = Duration::hours(hours.max(1));
    let mut windows = Vec::new();
    let mut cursor = start;

    loop {
        let next = cursor + step;
        if next >= end {
            windows.push(Window { start: cursor, end });
            break;
        }
        windows.push(Window {
            start: cursor,
            end: next - Duration::seconds(1),
        });
        cursor = next;
    }

    windows
}

/// 是否超過單一視窗長度
pub fn exceeds_window(range: &DateRange, hours: i64) -> bool {
    range.end - range.start > Duration::hours(hours.max(1))
}

pub fn params_for_window(
    params: &Map<String, Value>,
    range: &DateRange,
    window: &Window,
) -> Map<String, Value> {
    let mut sub = params.clone();
    sub.insert(
        range.start_param.to_string(),
        Value::String(format_upstream(&window.start)),
    );
    sub.insert(
        range.end_param.to_string(),
        Value::String(format_upstream(&window.end)),
    );
    sub
}

/// Merge per-window results by concatenation, in the order given.
pub fn concat_results(results: Vec<Value>) -> Value {
    results
        .into_iter()
        .fold(Value::Null, merge_pair)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// 只含物件/陣列子節點的物件視為容器（例如 WAYBILL_LIST），否則為一筆紀錄
fn is_container(map: &Map<String, Value>) -> bool {
    !map.is_empty()
        && map
            .values()
            .all(|v| matches!(v, Value::Object(_) | Value::Array(_)) || is_empty(v))
}

fn into_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other if is_empty(&other) => Vec::new(),
        other => vec![other],
    }
}

fn merge_pair(left: Value, right: Value) -> Value {
    if is_empty(&left) {
        return right;
    }
    if is_empty(&right) {
        return left;
    }

    match (left, right) {
        (Value::Object(mut l), Value::Object(r)) if is_container(&l) && is_container(&r) => {
            for (key, value) in r {
                match l.get_mut(&key) {
                    Some(existing) => {
                        let current = existing.take();
                        *existing = merge_pair(current, value);
                    }
                    None => {
                        l.insert(key, value);
                    }
                }
            }
            Value::Object(l)
        }
        (l @ (Value::Object(_) | Value::Array(_)), r)
        | (l, r @ (Value::Object(_) | Value::Array(_))) => {
            let mut items = into_items(l);
            items.extend(into_items(r));
            Value::Array(items)
        }
        // 純量（例如 STATUS）保留第一個
        (l, _) => l,
    }
}
