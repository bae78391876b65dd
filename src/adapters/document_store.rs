use crate::core::DocumentStore;
use crate::utils::error::Result;
use crate::utils::validation::validate_identifier;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// `<data_dir>/<user_id>/<data_type>.json`，寫入時先寫暫存檔再 rename
#[derive(Debug, Clone)]
pub struct FileDocumentStore {
    data_dir: PathBuf,
}

impl FileDocumentStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn document_path(&self, user_id: &str, data_type: &str) -> Result<PathBuf> {
        validate_identifier("user_id", user_id)?;
        validate_identifier("data_type", data_type)?;
        Ok(self.data_dir.join(user_id).join(format!("{}.json", data_type)))
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, user_id: &str, data_type: &str) -> Result<Option<Value>> {
        let path = self.document_path(user_id, data_type)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, user_id: &str, data_type: &str, document: &Value) -> Result<()> {
        let path = self.document_path(user_id, data_type)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // 每次寫入各自的暫存檔，rename 才不會互相踩到
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_path = path.with_extension(format!("json.{}.{}.tmp", std::process::id(), seq));
        tokio::fs::write(&tmp_path, serde_json::to_vec_pretty(document)?).await?;
        tokio::fs::rename(&tmp_path, &path).await?;

        tracing::debug!("💾 Stored {}/{} ({})", user_id, data_type, path.display());
        Ok(())
    }
}

/// In-process store, used when no data directory is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<(String, String), Value>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, user_id: &str, data_type: &str) -> Result<Option<Value>> {
        validate_identifier("user_id", user_id)?;
        validate_identifier("data_type", data_type)?;
        let documents = self.documents.read().await;
        Ok(documents
            .get(&(user_id.to_string(), data_type.to_string()))
            .cloned())
    }

    async fn put(&self, user_id: &str, data_type: &str, document: &Value) -> Result<()> {
        validate_identifier("user_id", user_id)?;
        validate_identifier("data_type", data_type)?;
        let mut documents = self.documents.write().await;
        documents.insert((user_id.to_string(), data_type.to_string()), document.clone());
        Ok(())
    }
}
