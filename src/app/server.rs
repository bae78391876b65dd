use crate::adapters::{FileDocumentStore, LocalStorage, MemoryDocumentStore};
use crate::app::pipelines::{parse_period, DebtPipeline, InventoryPipeline, ReportContext};
use crate::config::ProxyConfig;
use crate::core::operations::OperationAllowList;
use crate::core::soap_client::SoapClient;
use crate::core::{DocumentStore, ReportEngine, RsService};
use crate::utils::error::{ProxyError, Result};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, Method},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "rs-waybill-proxy";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn RsService>,
    pub documents: Arc<dyn DocumentStore>,
    pub allow_list: Arc<OperationAllowList>,
    pub report_storage: LocalStorage,
    pub detail_batch_size: usize,
    pub batch_delay: Duration,
}

impl AppState {
    pub fn new(
        service: Arc<dyn RsService>,
        documents: Arc<dyn DocumentStore>,
        allow_list: OperationAllowList,
    ) -> Self {
        Self {
            service,
            documents,
            allow_list: Arc::new(allow_list),
            report_storage: LocalStorage::new("./reports"),
            detail_batch_size: 5,
            batch_delay: Duration::from_millis(250),
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Result<Self> {
        let client = SoapClient::new(config.soap_settings())?;
        if config.service_user().is_none() {
            tracing::warn!("⚠️ No service credentials configured, callers must send su/sp");
        }

        let documents: Arc<dyn DocumentStore> = match config.data_dir() {
            Some(dir) => {
                tracing::info!("🗄️ Document store: {}", dir);
                Arc::new(FileDocumentStore::new(dir))
            }
            None => {
                tracing::warn!("⚠️ storage.data_dir not set, documents are kept in memory only");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        let mut state = Self::new(Arc::new(client), documents, config.allow_list());
        state.report_storage = LocalStorage::new(config.report_dir());
        state.detail_batch_size = config.detail_batch_size();
        state.batch_delay = config.batch_delay();
        Ok(state)
    }

    pub fn report_context(&self, user_id: &str, start: &str, end: &str) -> Result<ReportContext> {
        Ok(ReportContext {
            service: self.service.clone(),
            documents: self.documents.clone(),
            user_id: user_id.to_string(),
            period: parse_period(start, end)?,
            detail_batch_size: self.detail_batch_size,
            batch_delay: self.batch_delay,
        })
    }
}

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/health", get(health))
        .route("/api/rs/{operation}", post(call_operation))
        .route(
            "/api/store/{user_id}/{data_type}",
            get(get_document).put(put_document),
        )
        .route("/api/reports/inventory", get(inventory_report))
        .route("/api/reports/debts", get(debt_report))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

/// 空 body 視為 `{}`；其他非物件一律 400
pub fn parse_params(body: &[u8]) -> Result<Map<String, Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(params)) => Ok(params),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err(ProxyError::InvalidRequest {
            message: "request body must be a JSON object".to_string(),
        }),
        Err(e) => Err(ProxyError::InvalidRequest {
            message: format!("request body is not valid JSON: {}", e),
        }),
    }
}

async fn call_operation(
    State(state): State<AppState>,
    Path(operation): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    state.allow_list.check(&operation)?;
    let params = parse_params(&body)?;

    tracing::info!("➡️ {} ({} params)", operation, params.len());
    let result = state.service.call(&operation, params).await?;
    Ok(Json(result))
}

async fn get_document(
    State(state): State<AppState>,
    Path((user_id, data_type)): Path<(String, String)>,
) -> Result<Json<Value>> {
    state
        .documents
        .get(&user_id, &data_type)
        .await?
        .map(Json)
        .ok_or_else(|| ProxyError::NotFound {
            message: format!("{}/{}", user_id, data_type),
        })
}

async fn put_document(
    State(state): State<AppState>,
    Path((user_id, data_type)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<Value>> {
    let document: Value = serde_json::from_slice(&body).map_err(|e| ProxyError::InvalidRequest {
        message: format!("document is not valid JSON: {}", e),
    })?;

    state.documents.put(&user_id, &data_type, &document).await?;
    tracing::info!("🗄️ Stored {}/{}", user_id, data_type);
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub user_id: String,
    pub start: String,
    pub end: String,
}

async fn inventory_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>> {
    let context = state.report_context(&query.user_id, &query.start, &query.end)?;
    let pipeline = InventoryPipeline::new(context, state.report_storage.clone());
    let (output_path, rows) = ReportEngine::new(pipeline).run_with_rows().await?;
    tracing::info!("📁 Report saved to: {}", output_path);
    Ok(Json(rows))
}

async fn debt_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<Value>> {
    let context = state.report_context(&query.user_id, &query.start, &query.end)?;
    let pipeline = DebtPipeline::new(context, state.report_storage.clone());
    let (output_path, rows) = ReportEngine::new(pipeline).run_with_rows().await?;
    tracing::info!("📁 Report saved to: {}", output_path);
    Ok(Json(rows))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: &ProxyConfig, bind_override: Option<&str>) -> Result<()> {
    let addr = match bind_override {
        Some(bind) => bind.parse::<SocketAddr>().map_err(|e| ProxyError::InvalidConfigValueError {
            field: "--bind".to_string(),
            value: bind.to_string(),
            reason: format!("{}", e),
        })?,
        None => config.bind_addr()?,
    };

    let state = AppState::from_config(config)?;
    if state.allow_list.is_empty() {
        tracing::warn!("⚠️ Allow-list is empty, every proxied operation will be rejected");
    }
    tracing::info!(
        "🔐 {} operations allowed, upstream {}",
        state.allow_list.len(),
        config.upstream.endpoint
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("🚀 {} listening on {}", SERVICE_NAME, addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("⚠️ Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
