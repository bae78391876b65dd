use crate::core::{ReportOutput, ReportPipeline};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// 依序執行報表的 extract / transform / load
pub struct ReportEngine<P: ReportPipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: ReportPipeline> ReportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Extract and transform without loading.
    pub async fn build(&self) -> Result<ReportOutput> {
        let name = self.pipeline.name();
        tracing::info!("🚀 Building {} report", name);
        self.monitor.log_stats("Report started");

        let data = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} sales and {} purchase waybills",
            data.sales.len(),
            data.purchases.len()
        );
        self.monitor.log_stats("Extract completed");

        let output = self.pipeline.transform(data).await?;
        tracing::info!("🔄 {} report has {} rows", name, output.row_count);
        self.monitor.log_stats("Transform completed");

        Ok(output)
    }

    pub async fn run(&self) -> Result<String> {
        let (output_path, _) = self.run_with_rows().await?;
        Ok(output_path)
    }

    /// Build, load, and hand the rows back as well as the output path.
    pub async fn run_with_rows(&self) -> Result<(String, serde_json::Value)> {
        let output = self.build().await?;
        let rows = output.rows.clone();

        let output_path = self.pipeline.load(output).await?;
        tracing::info!("💾 Report saved to: {}", output_path);
        self.monitor.log_stats("Load completed");

        if self.monitor.is_enabled() {
            self.monitor.log_final_stats();
        }

        Ok((output_path, rows))
    }
}
