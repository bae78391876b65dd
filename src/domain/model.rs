use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsLine {
    pub name: String,
    pub unit: Option<String>,
    pub quantity: f64,
    pub price: f64,
    pub amount: f64,
    pub bar_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waybill {
    pub id: String,
    pub number: Option<String>,
    pub status: Option<i64>,
    pub seller_tin: Option<String>,
    pub seller_name: Option<String>,
    pub buyer_tin: Option<String>,
    pub buyer_name: Option<String>,
    pub full_amount: Option<f64>,
    pub create_date: Option<NaiveDateTime>,
    pub begin_date: Option<NaiveDateTime>,
    pub goods: Vec<GoodsLine>,
}

impl Waybill {
    /// 已刪除 (-1) 或作廢 (-2) 的運單不計入彙總
    pub fn is_void(&self) -> bool {
        self.status.is_some_and(|s| s < 0)
    }

    /// FULL_AMOUNT, falling back to the goods total.
    pub fn total_amount(&self) -> f64 {
        self.full_amount
            .unwrap_or_else(|| self.goods.iter().map(|g| g.amount).sum())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRow {
    pub product: String,
    pub unit: Option<String>,
    pub purchased_quantity: f64,
    pub purchased_amount: f64,
    pub sold_quantity: f64,
    pub sold_amount: f64,
    pub balance_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDebt {
    pub tin: String,
    pub name: Option<String>,
    pub starting_debt: f64,
    pub sales_total: f64,
    pub payments_total: f64,
    pub waybill_count: usize,
    pub balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// 報表 extract 階段的輸出
#[derive(Debug, Clone, Default)]
pub struct ReportData {
    pub sales: Vec<Waybill>,
    pub purchases: Vec<Waybill>,
}

#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub name: String,
    pub rows: serde_json::Value,
    pub csv_output: String,
    pub row_count: usize,
}
