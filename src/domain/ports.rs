use crate::domain::model::{ReportData, ReportOutput};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Report output files (CSV / JSON) on some backing storage.
pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 以 user id + data type 為鍵的 JSON 文件庫
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, user_id: &str, data_type: &str) -> Result<Option<Value>>;
    async fn put(&self, user_id: &str, data_type: &str, document: &Value) -> Result<()>;
}

/// One call against the RS.ge service, returning the unwrapped result.
#[async_trait]
pub trait RsService: Send + Sync {
    async fn call(&self, operation: &str, params: Map<String, Value>) -> Result<Value>;
}

#[async_trait]
pub trait ReportPipeline: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self) -> Result<ReportData>;
    async fn transform(&self, data: ReportData) -> Result<ReportOutput>;
    async fn load(&self, output: ReportOutput) -> Result<String>;
}
