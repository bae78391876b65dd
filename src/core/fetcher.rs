use crate::domain::ports::RsService;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

pub const DETAIL_OPERATION: &str = "get_waybill";

/// 分批取得運單明細：批內並行，批與批之間固定延遲
pub struct DetailFetcher {
    service: Arc<dyn RsService>,
    batch_size: usize,
    batch_delay: Duration,
}

impl DetailFetcher {
    pub fn new(service: Arc<dyn RsService>, batch_size: usize, batch_delay: Duration) -> Self {
        Self {
            service,
            batch_size: batch_size.max(1),
            batch_delay,
        }
    }

    /// Fetch `get_waybill` for every id; failed ids are logged and skipped.
    pub async fn fetch_details(&self, ids: &[String]) -> Vec<Value> {
        let mut details = Vec::with_capacity(ids.len());
        let batches: Vec<&[String]> = ids.chunks(self.batch_size).collect();

        for (index, batch) in batches.iter().enumerate() {
            tracing::debug!(
                "📡 Fetching waybill details batch {}/{} ({} ids)",
                index + 1,
                batches.len(),
                batch.len()
            );

            let calls = batch.iter().map(|id| async move {
                let mut params = Map::new();
                params.insert("waybill_id".to_string(), Value::String(id.clone()));
                (id, self.service.call(DETAIL_OPERATION, params).await)
            });

            for (id, result) in join_all(calls).await {
                match result {
                    Ok(detail) => details.push(detail),
                    Err(e) => tracing::warn!("⚠️ Skipping waybill {}: {}", id, e),
                }
            }

            if index + 1 < batches.len() && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
        }

        tracing::info!("📡 Fetched {}/{} waybill details", details.len(), ids.len());
        details
    }
}
