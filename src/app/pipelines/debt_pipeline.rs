use super::{report_output, write_output, ReportContext, SALES_OPERATION};
use crate::core::debts::{
    aggregate_debts, payments_from_document, starting_debts_from_document, PAYMENTS,
    STARTING_DEBTS,
};
use crate::core::{ReportData, ReportOutput, ReportPipeline, Storage};
use crate::utils::error::Result;
use async_trait::async_trait;

pub struct DebtPipeline<S: Storage> {
    context: ReportContext,
    storage: S,
}

impl<S: Storage> DebtPipeline<S> {
    pub fn new(context: ReportContext, storage: S) -> Self {
        Self { context, storage }
    }
}

#[async_trait]
impl<S: Storage> ReportPipeline for DebtPipeline<S> {
    fn name(&self) -> &str {
        "debts"
    }

    async fn extract(&self) -> Result<ReportData> {
        let sales = self.context.list_waybills(SALES_OPERATION).await?;
        Ok(ReportData {
            sales,
            purchases: Vec::new(),
        })
    }

    async fn transform(&self, data: ReportData) -> Result<ReportOutput> {
        let starting = starting_debts_from_document(self.context.document(STARTING_DEBTS).await?.as_ref());
        let payments = payments_from_document(
            self.context.document(PAYMENTS).await?.as_ref(),
            Some(self.context.period.end),
        );

        let rows = aggregate_debts(&data.sales, &starting, &payments);
        tracing::info!("💰 {} customer balances", rows.len());
        report_output(self.context.file_stem(self.name()), &rows)
    }

    async fn load(&self, output: ReportOutput) -> Result<String> {
        write_output(&self.storage, &output).await
    }
}
