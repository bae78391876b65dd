use super::{report_output, write_output, ReportContext, PURCHASES_OPERATION, SALES_OPERATION};
use crate::core::fetcher::DetailFetcher;
use crate::core::inventory::{aggregate_inventory, ProductMappings, PRODUCT_MAPPINGS};
use crate::core::waybill::attach_goods;
use crate::core::{ReportData, ReportOutput, ReportPipeline, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;

/// 進貨（買方運單）與銷貨（賣方運單）的貨品進出彙總
pub struct InventoryPipeline<S: Storage> {
    context: ReportContext,
    storage: S,
}

impl<S: Storage> InventoryPipeline<S> {
    pub fn new(context: ReportContext, storage: S) -> Self {
        Self { context, storage }
    }
}

#[async_trait]
impl<S: Storage> ReportPipeline for InventoryPipeline<S> {
    fn name(&self) -> &str {
        "inventory"
    }

    async fn extract(&self) -> Result<ReportData> {
        let (mut sales, mut purchases) = tokio::try_join!(
            self.context.list_waybills(SALES_OPERATION),
            self.context.list_waybills(PURCHASES_OPERATION)
        )?;

        // 清單不含貨品，逐張取明細
        let mut seen = HashSet::new();
        let ids: Vec<String> = sales
            .iter()
            .chain(purchases.iter())
            .filter(|w| !w.is_void() && w.goods.is_empty())
            .filter(|w| seen.insert(w.id.clone()))
            .map(|w| w.id.clone())
            .collect();

        let fetcher = DetailFetcher::new(
            self.context.service.clone(),
            self.context.detail_batch_size,
            self.context.batch_delay,
        );
        let details = fetcher.fetch_details(&ids).await;

        attach_goods(&mut sales, &details);
        attach_goods(&mut purchases, &details);

        Ok(ReportData { sales, purchases })
    }

    async fn transform(&self, data: ReportData) -> Result<ReportOutput> {
        let mappings = ProductMappings::from_document(self.context.document(PRODUCT_MAPPINGS).await?.as_ref());
        if mappings.is_empty() {
            tracing::debug!("🏷️ No product name mappings for {}", self.context.user_id);
        } else {
            tracing::debug!("🏷️ {} product name mappings", mappings.len());
        }

        let rows = aggregate_inventory(&data.purchases, &data.sales, &mappings);
        report_output(self.context.file_stem(self.name()), &rows)
    }

    async fn load(&self, output: ReportOutput) -> Result<String> {
        write_output(&self.storage, &output).await
    }
}
