use crate::core::parsing::{is_valid_tin, parse_amount, parse_datetime, round2};
use crate::domain::model::{CustomerDebt, Waybill};
use chrono::NaiveDateTime;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

pub const STARTING_DEBTS: &str = "starting_debts";
pub const PAYMENTS: &str = "payments";

/// `{tin: amount}`；無法解析的金額略過
pub fn starting_debts_from_document(document: Option<&Value>) -> HashMap<String, f64> {
    let Some(map) = document.and_then(Value::as_object) else {
        return HashMap::new();
    };

    map.iter()
        .filter_map(|(tin, amount)| Some((tin.trim().to_string(), parse_amount(amount)?)))
        .collect()
}

/// Payment totals per TIN from `{tin: amount | [{amount, date?}]}`.
///
/// Payments dated after `until` are not counted.
pub fn payments_from_document(document: Option<&Value>, until: Option<NaiveDateTime>) -> HashMap<String, f64> {
    let Some(map) = document.and_then(Value::as_object) else {
        return HashMap::new();
    };

    map.iter()
        .map(|(tin, entry)| (tin.trim().to_string(), payment_total(entry, until)))
        .collect()
}

fn payment_total(entry: &Value, until: Option<NaiveDateTime>) -> f64 {
    match entry {
        Value::Array(items) => items.iter().map(|item| payment_total(item, until)).sum(),
        Value::Object(payment) => {
            let after_period = match (until, payment.get("date").and_then(Value::as_str)) {
                (Some(until), Some(date)) => parse_datetime(date).is_some_and(|d| d > until),
                _ => false,
            };
            if after_period {
                return 0.0;
            }
            payment.get("amount").and_then(parse_amount).unwrap_or(0.0)
        }
        other => parse_amount(other).unwrap_or(0.0),
    }
}

#[derive(Default)]
struct Account {
    name: Option<String>,
    sales_total: f64,
    waybill_count: usize,
}

/// 每位買方：期初欠款 + 銷貨 − 已收款
pub fn aggregate_debts(
    sales: &[Waybill],
    starting_debts: &HashMap<String, f64>,
    payments: &HashMap<String, f64>,
) -> Vec<CustomerDebt> {
    let mut accounts: BTreeMap<String, Account> = BTreeMap::new();

    for waybill in sales.iter().filter(|w| !w.is_void()) {
        let Some(tin) = waybill.buyer_tin.as_deref().map(str::trim).filter(|t| !t.is_empty()) else {
            continue;
        };
        if !is_valid_tin(tin) {
            tracing::warn!("⚠️ Waybill {} has malformed buyer TIN '{}'", waybill.id, tin);
        }
        let account = accounts.entry(tin.to_string()).or_default();
        if account.name.is_none() {
            account.name = waybill.buyer_name.clone();
        }
        account.sales_total += waybill.total_amount();
        account.waybill_count += 1;
    }

    for tin in starting_debts.keys().chain(payments.keys()) {
        accounts.entry(tin.clone()).or_default();
    }

    let mut debts: Vec<CustomerDebt> = accounts
        .into_iter()
        .map(|(tin, account)| {
            let starting_debt = starting_debts.get(&tin).copied().unwrap_or(0.0);
            let payments_total = payments.get(&tin).copied().unwrap_or(0.0);
            CustomerDebt {
                balance: round2(starting_debt + account.sales_total - payments_total),
                starting_debt: round2(starting_debt),
                sales_total: round2(account.sales_total),
                payments_total: round2(payments_total),
                waybill_count: account.waybill_count,
                name: account.name,
                tin,
            }
        })
        .collect();

    debts.sort_by(|a, b| b.balance.total_cmp(&a.balance).then_with(|| a.tin.cmp(&b.tin)));
    debts
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sale(id: &str, tin: &str, amount: f64, status: i64) -> Waybill {
        Waybill {
            id: id.to_string(),
            number: None,
            status: Some(status),
            seller_tin: None,
            seller_name: None,
            buyer_tin: Some(tin.to_string()),
            buyer_name: Some(format!("Buyer {}", tin)),
            full_amount: Some(amount),
            create_date: None,
            begin_date: None,
            goods: vec![],
        }
    }

    #[test]
    fn test_debt_balance_per_buyer() {
        let sales = vec![
            sale("1", "204567890", 100.0, 1),
            sale("2", "204567890", 50.25, 2),
            sale("3", "400000001", 10.0, 1),
            sale("4", "400000001", 999.0, -2),
        ];
        let starting = starting_debts_from_document(Some(&json!({"204567890": "20,00"})));
        let payments = payments_from_document(
            Some(&json!({"204567890": [{"amount": 70}, {"amount": "0.25"}]})),
            None,
        );

        let debts = aggregate_debts(&sales, &starting, &payments);
        assert_eq!(debts.len(), 2);

        let first = &debts[0];
        assert_eq!(first.tin, "204567890");
        assert_eq!(first.starting_debt, 20.0);
        assert_eq!(first.sales_total, 150.25);
        assert_eq!(first.payments_total, 70.25);
        assert_eq!(first.balance, 100.0);
        assert_eq!(first.waybill_count, 2);

        assert_eq!(debts[1].sales_total, 10.0);
        assert_eq!(debts[1].waybill_count, 1);
    }

    #[test]
    fn test_customers_with_only_starting_debt_are_listed() {
        let starting = starting_debts_from_document(Some(&json!({"123456789": 45})));
        let debts = aggregate_debts(&[], &starting, &HashMap::new());
        assert_eq!(debts.len(), 1);
        assert_eq!(debts[0].balance, 45.0);
        assert!(debts[0].name.is_none());
    }

    #[test]
    fn test_payments_after_period_are_ignored() {
        let until = parse_datetime("2024-01-31T23:59:59");
        let payments = payments_from_document(
            Some(&json!({"204567890": [
                {"amount": 10, "date": "2024-01-15"},
                {"amount": 99, "date": "2024-02-02"},
                {"amount": 5}
            ], "400000001": "12.5"})),
            until,
        );
        assert_eq!(payments["204567890"], 15.0);
        assert_eq!(payments["400000001"], 12.5);
    }

    #[test]
    fn test_malformed_documents() {
        assert!(starting_debts_from_document(Some(&json!(["x"]))).is_empty());
        assert!(payments_from_document(None, None).is_empty());
        let starting = starting_debts_from_document(Some(&json!({"1": "n/a", "2": 3})));
        assert_eq!(starting.len(), 1);
    }
}
