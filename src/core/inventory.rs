use crate::core::parsing::round2;
use crate::domain::model::{InventoryRow, Waybill};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Data-type key of the product-name mapping document.
pub const PRODUCT_MAPPINGS: &str = "product_mappings";

/// 上游品名 → 使用者自訂品名；比對時忽略大小寫與前後空白
#[derive(Debug, Clone, Default)]
pub struct ProductMappings {
    names: HashMap<String, String>,
}

impl ProductMappings {
    pub fn from_document(document: Option<&Value>) -> Self {
        let names = document
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .filter_map(|(from, to)| {
                        let to = to.as_str()?.trim();
                        (!to.is_empty()).then(|| (normalize(from), to.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self { names }
    }

    pub fn resolve(&self, name: &str) -> String {
        self.names
            .get(&normalize(name))
            .cloned()
            .unwrap_or_else(|| name.trim().to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Default)]
struct Totals {
    unit: Option<String>,
    purchased_quantity: f64,
    purchased_amount: f64,
    sold_quantity: f64,
    sold_amount: f64,
}

/// Purchases add stock, sales remove it; void waybills are skipped.
pub fn aggregate_inventory(
    purchases: &[Waybill],
    sales: &[Waybill],
    mappings: &ProductMappings,
) -> Vec<InventoryRow> {
    let mut totals: BTreeMap<String, Totals> = BTreeMap::new();

    for (waybills, is_purchase) in [(purchases, true), (sales, false)] {
        for waybill in waybills.iter().filter(|w| !w.is_void()) {
            for line in &waybill.goods {
                let entry = totals.entry(mappings.resolve(&line.name)).or_default();
                if entry.unit.is_none() {
                    entry.unit = line.unit.clone();
                }
                if is_purchase {
                    entry.purchased_quantity += line.quantity;
                    entry.purchased_amount += line.amount;
                } else {
                    entry.sold_quantity += line.quantity;
                    entry.sold_amount += line.amount;
                }
            }
        }
    }

    totals
        .into_iter()
        .map(|(product, t)| InventoryRow {
            product,
            unit: t.unit,
            purchased_quantity: round2(t.purchased_quantity),
            purchased_amount: round2(t.purchased_amount),
            sold_quantity: round2(t.sold_quantity),
            sold_amount: round2(t.sold_amount),
            balance_quantity: round2(t.purchased_quantity - t.sold_quantity),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::GoodsLine;
    use serde_json::json;

    fn waybill(id: &str, status: i64, goods: &[(&str, f64, f64)]) -> Waybill {
        Waybill {
            id: id.to_string(),
            number: None,
            status: Some(status),
            seller_tin: None,
            seller_name: None,
            buyer_tin: None,
            buyer_name: None,
            full_amount: None,
            create_date: None,
            begin_date: None,
            goods: goods
                .iter()
                .map(|(name, quantity, amount)| GoodsLine {
                    name: name.to_string(),
                    unit: Some("kg".to_string()),
                    quantity: *quantity,
                    price: 0.0,
                    amount: *amount,
                    bar_code: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_aggregate_purchases_and_sales() {
        let purchases = vec![
            waybill("1", 2, &[("Flour", 100.0, 150.0), ("Sugar", 20.0, 40.0)]),
            waybill("2", 1, &[("Flour", 50.0, 75.0)]),
        ];
        let sales = vec![waybill("3", 1, &[("Flour", 30.0, 60.0)])];

        let rows = aggregate_inventory(&purchases, &sales, &ProductMappings::default());
        assert_eq!(rows.len(), 2);

        let flour = &rows[0];
        assert_eq!(flour.product, "Flour");
        assert_eq!(flour.purchased_quantity, 150.0);
        assert_eq!(flour.purchased_amount, 225.0);
        assert_eq!(flour.sold_quantity, 30.0);
        assert_eq!(flour.balance_quantity, 120.0);
        assert_eq!(rows[1].product, "Sugar");
    }

    #[test]
    fn test_void_waybills_are_skipped() {
        let purchases = vec![waybill("1", -1, &[("Flour", 100.0, 150.0)])];
        let sales = vec![waybill("2", -2, &[("Flour", 5.0, 10.0)])];
        assert!(aggregate_inventory(&purchases, &sales, &ProductMappings::default()).is_empty());
    }

    #[test]
    fn test_mappings_merge_product_names() {
        let mappings = ProductMappings::from_document(Some(&json!({
            " FLOUR premium ": "Flour",
            "ignored": 5
        })));
        assert_eq!(mappings.len(), 1);

        let purchases = vec![waybill("1", 1, &[("Flour premium", 10.0, 20.0), ("Flour", 5.0, 5.0)])];
        let rows = aggregate_inventory(&purchases, &[], &mappings);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].purchased_quantity, 15.0);
    }

    #[test]
    fn test_mappings_from_missing_document() {
        let mappings = ProductMappings::from_document(None);
        assert!(mappings.is_empty());
        assert_eq!(mappings.resolve("  Salt "), "Salt");
    }
}
