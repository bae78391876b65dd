//! 從 RS.ge 回應（XML 轉出的 JSON，結構不固定）中找出運單。

use crate::core::parsing::{parse_amount, parse_datetime, round2, value_i64, value_text};
use crate::domain::model::{GoodsLine, Waybill};
use serde_json::{Map, Value};
use std::collections::HashSet;

const WAYBILL_KEY: &str = "WAYBILL";

/// Fields that only waybill records carry.
const WAYBILL_MARKERS: &[&str] = &[
    "WAYBILL_NUMBER",
    "FULL_AMOUNT",
    "BUYER_TIN",
    "SELLER_TIN",
    "CREATE_DATE",
    "BEGIN_DATE",
];

/// Walk any response and collect waybills, first occurrence of each `ID` wins.
pub fn extract_waybills(value: &Value) -> Vec<Waybill> {
    let mut seen = HashSet::new();
    let mut waybills = Vec::new();
    visit(value, None, &mut seen, &mut waybills);
    waybills
}

fn visit(value: &Value, parent_key: Option<&str>, seen: &mut HashSet<String>, out: &mut Vec<Waybill>) {
    match value {
        Value::Object(map) => {
            if let Some(id) = waybill_id(map, parent_key) {
                if seen.insert(id.clone()) {
                    out.push(parse_waybill(id, map));
                }
                return;
            }
            for (key, child) in map {
                visit(child, Some(key), seen, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                visit(item, parent_key, seen, out);
            }
        }
        _ => {}
    }
}

fn waybill_id(map: &Map<String, Value>, parent_key: Option<&str>) -> Option<String> {
    let id = map.get("ID").and_then(value_text)?;
    let under_waybill_key = parent_key.is_some_and(|k| k.eq_ignore_ascii_case(WAYBILL_KEY));
    let has_marker = WAYBILL_MARKERS.iter().any(|marker| map.contains_key(*marker));
    (under_waybill_key || has_marker).then_some(id)
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(value_text)
}

fn parse_waybill(id: String, map: &Map<String, Value>) -> Waybill {
    let mut goods = Vec::new();
    for (key, child) in map {
        if key != "ID" {
            collect_goods(child, &mut goods);
        }
    }

    Waybill {
        id,
        number: text(map, "WAYBILL_NUMBER"),
        status: map.get("STATUS").and_then(value_i64),
        seller_tin: text(map, "SELLER_TIN"),
        seller_name: text(map, "SELLER_NAME"),
        buyer_tin: text(map, "BUYER_TIN"),
        buyer_name: text(map, "BUYER_NAME"),
        full_amount: map.get("FULL_AMOUNT").and_then(parse_amount),
        create_date: map.get("CREATE_DATE").and_then(Value::as_str).and_then(parse_datetime),
        begin_date: map.get("BEGIN_DATE").and_then(Value::as_str).and_then(parse_datetime),
        goods,
    }
}

/// 任何帶 W_NAME 的物件都是一筆貨品
fn collect_goods(value: &Value, out: &mut Vec<GoodsLine>) {
    match value {
        Value::Object(map) => {
            if let Some(name) = text(map, "W_NAME") {
                out.push(parse_goods(name, map));
                return;
            }
            for child in map.values() {
                collect_goods(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_goods(item, out)),
        _ => {}
    }
}

fn parse_goods(name: String, map: &Map<String, Value>) -> GoodsLine {
    let quantity = map.get("QUANTITY").and_then(parse_amount).unwrap_or(0.0);
    let price = map.get("PRICE").and_then(parse_amount).unwrap_or(0.0);
    let amount = map
        .get("AMOUNT")
        .and_then(parse_amount)
        .unwrap_or_else(|| round2(quantity * price));

    GoodsLine {
        name,
        unit: text(map, "UNIT_TXT").or_else(|| text(map, "UNIT_ID")),
        quantity,
        price,
        amount,
        bar_code: text(map, "BAR_CODE"),
    }
}

/// Attach goods from detail responses to list waybills by `ID`.
pub fn attach_goods(waybills: &mut [Waybill], details: &[Value]) {
    let detailed: Vec<Waybill> = details.iter().flat_map(extract_waybills).collect();
    for waybill in waybills.iter_mut() {
        if let Some(detail) = detailed
            .iter()
            .find(|d| d.id == waybill.id && !d.goods.is_empty())
        {
            waybill.goods = detail.goods.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_single_waybill_object() {
        let result = json!({"WAYBILL_LIST": {"WAYBILL": {
            "ID": "901", "WAYBILL_NUMBER": "0012345", "STATUS": "1",
            "BUYER_TIN": "204567890", "BUYER_NAME": "შპს მაღაზია",
            "FULL_AMOUNT": "150.50", "CREATE_DATE": "2024-01-05T10:00:00"
        }}});

        let waybills = extract_waybills(&result);
        assert_eq!(waybills.len(), 1);
        let w = &waybills[0];
        assert_eq!(w.id, "901");
        assert_eq!(w.number.as_deref(), Some("0012345"));
        assert_eq!(w.status, Some(1));
        assert_eq!(w.full_amount, Some(150.5));
        assert!(w.create_date.is_some());
        assert!(!w.is_void());
    }

    #[test]
    fn test_extract_dedupes_by_id_across_shapes() {
        let result = json!([
            {"WAYBILL_LIST": {"WAYBILL": [{"ID": "1", "FULL_AMOUNT": "10"}, {"ID": "2", "FULL_AMOUNT": "20"}]}},
            {"nested": {"deeper": {"WAYBILL": {"ID": "1", "FULL_AMOUNT": "999"}}}},
            {"ID": "3", "SELLER_TIN": "400000001"}
        ]);

        let waybills = extract_waybills(&result);
        let ids: Vec<&str> = waybills.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(waybills[0].full_amount, Some(10.0));
    }

    #[test]
    fn test_objects_without_markers_are_not_waybills() {
        let result = json!({"ERROR_CODES": {"ERROR_CODE": [{"ID": "-101", "TEXT": "seller"}]}});
        assert!(extract_waybills(&result).is_empty());
        assert!(extract_waybills(&json!("")).is_empty());
    }

    #[test]
    fn test_goods_are_parsed_from_detail() {
        let detail = json!({"WAYBILL": {
            "ID": "77", "STATUS": "2", "FULL_AMOUNT": "25",
            "GOODS_LIST": {"GOODS": [
                {"ID": "1", "W_NAME": "პური", "UNIT_TXT": "ცალი", "QUANTITY": "10", "PRICE": "1.5", "AMOUNT": "15"},
                {"ID": "2", "W_NAME": "რძე", "QUANTITY": "4", "PRICE": "2.5"}
            ]}
        }});

        let waybills = extract_waybills(&detail);
        assert_eq!(waybills.len(), 1);
        let goods = &waybills[0].goods;
        assert_eq!(goods.len(), 2);
        assert_eq!(goods[0].unit.as_deref(), Some("ცალი"));
        assert_eq!(goods[1].amount, 10.0);
    }

    #[test]
    fn test_attach_goods_by_id() {
        let mut list = extract_waybills(&json!({"WAYBILL": [{"ID": "5", "FULL_AMOUNT": "3"}, {"ID": "6", "FULL_AMOUNT": "4"}]}));
        let details = vec![json!({"WAYBILL": {"ID": "6", "GOODS_LIST": {"GOODS": {"W_NAME": "X", "QUANTITY": "2", "PRICE": "2"}}}})];

        attach_goods(&mut list, &details);
        assert!(list[0].goods.is_empty());
        assert_eq!(list[1].goods.len(), 1);
        assert_eq!(list[1].total_amount(), 4.0);
    }
}
