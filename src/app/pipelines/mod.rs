pub mod debt_pipeline;
pub mod inventory_pipeline;

pub use debt_pipeline::DebtPipeline;
pub use inventory_pipeline::InventoryPipeline;

use crate::core::parsing::{format_upstream, parse_date, parse_datetime};
use crate::core::waybill::extract_waybills;
use crate::core::{DocumentStore, RsService, Storage, Waybill};
use crate::domain::model::{ReportOutput, ReportPeriod};
use crate::utils::error::{ProxyError, Result};
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const SALES_OPERATION: &str = "get_waybills";
pub const PURCHASES_OPERATION: &str = "get_buyer_waybills";

/// 報表共用的依賴與參數
#[derive(Clone)]
pub struct ReportContext {
    pub service: Arc<dyn RsService>,
    pub documents: Arc<dyn DocumentStore>,
    pub user_id: String,
    pub period: ReportPeriod,
    pub detail_batch_size: usize,
    pub batch_delay: Duration,
}

impl ReportContext {
    /// List waybills created within the period.
    pub async fn list_waybills(&self, operation: &str) -> Result<Vec<Waybill>> {
        let mut params = Map::new();
        params.insert(
            "create_date_s".to_string(),
            Value::String(format_upstream(&self.period.start)),
        );
        params.insert(
            "create_date_e".to_string(),
            Value::String(format_upstream(&self.period.end)),
        );

        let result = self.service.call(operation, params).await?;
        let waybills = extract_waybills(&result);
        tracing::info!("📂 {}: {} waybills", operation, waybills.len());
        Ok(waybills)
    }

    pub async fn document(&self, data_type: &str) -> Result<Option<Value>> {
        self.documents.get(&self.user_id, data_type).await
    }

    fn file_stem(&self, report: &str) -> String {
        format!(
            "{}_{}_{}-{}",
            report,
            self.user_id,
            self.period.start.format("%Y%m%d"),
            self.period.end.format("%Y%m%d")
        )
    }
}

/// 解析報表期間；只給日期的結束日包含當天整天
pub fn parse_period(start: &str, end: &str) -> Result<ReportPeriod> {
    let parse = |field: &str, value: &str| -> Result<NaiveDateTime> {
        parse_datetime(value).ok_or_else(|| ProxyError::InvalidRequest {
            message: format!("{} '{}' is not a recognised date", field, value),
        })
    };

    let start_dt = parse("start", start)?;
    let mut end_dt = parse("end", end)?;
    if parse_date(end).is_some() {
        end_dt += ChronoDuration::days(1) - ChronoDuration::seconds(1);
    }

    if start_dt > end_dt {
        return Err(ProxyError::InvalidRequest {
            message: format!("start {} is after end {}", start, end),
        });
    }

    Ok(ReportPeriod {
        start: start_dt,
        end: end_dt,
    })
}

pub fn rows_to_csv<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    let bytes = writer.into_inner().map_err(|e| ProxyError::ProcessingError {
        message: format!("CSV flush failed: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| ProxyError::ProcessingError {
        message: format!("CSV is not UTF-8: {}", e),
    })
}

pub fn report_output<T: Serialize>(name: String, rows: &[T]) -> Result<ReportOutput> {
    Ok(ReportOutput {
        name,
        rows: serde_json::to_value(rows)?,
        csv_output: rows_to_csv(rows)?,
        row_count: rows.len(),
    })
}

/// 寫出 `<name>.csv` 與 `<name>.json`，回傳 CSV 檔名
pub async fn write_output<S: Storage>(storage: &S, output: &ReportOutput) -> Result<String> {
    let csv_name = format!("{}.csv", output.name);
    let json_name = format!("{}.json", output.name);

    storage.write_file(&csv_name, output.csv_output.as_bytes()).await?;
    let json = serde_json::to_vec_pretty(&output.rows)?;
    storage.write_file(&json_name, &json).await?;

    tracing::debug!("💾 Wrote {} and {} ({} rows)", csv_name, json_name, output.row_count);
    Ok(csv_name)
}
