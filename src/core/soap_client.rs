use crate::core::chunking::{
    concat_results, exceeds_window, find_date_range, params_for_window, split_windows,
    DEFAULT_CHUNK_HOURS,
};
use crate::core::envelope::{build_envelope, soap_action, DEFAULT_NAMESPACE};
use crate::core::operations::{DATE_RANGE_TOO_LARGE, SELLER_ID_REQUIRED};
use crate::core::parsing::value_text;
use crate::core::response::{parse_response, status_code};
use crate::domain::ports::RsService;
use crate::utils::error::{ProxyError, Result};
use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tokio::sync::OnceCell;

pub const SERVICE_USER_PARAM: &str = "su";
pub const SERVICE_PASSWORD_PARAM: &str = "sp";
pub const DEFAULT_SELLER_ID_PARAM: &str = "seller_un_id";

#[derive(Debug, Clone)]
pub struct SoapSettings {
    pub endpoint: String,
    pub namespace: String,
    pub timeout: Duration,
    pub service_user: Option<String>,
    pub service_password: Option<String>,
    pub seller_un_id: Option<String>,
    pub seller_id_param: String,
    pub chunk_hours: i64,
    pub chunk_concurrency: usize,
}

impl SoapSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            timeout: Duration::from_secs(60),
            service_user: None,
            service_password: None,
            seller_un_id: None,
            seller_id_param: DEFAULT_SELLER_ID_PARAM.to_string(),
            chunk_hours: DEFAULT_CHUNK_HOURS,
            chunk_concurrency: 4,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.service_user = Some(user.into());
        self.service_password = Some(password.into());
        self
    }
}

/// RS.ge SOAP 用戶端：-101 補 seller id 重試一次，-1064 切成 72 小時視窗並行呼叫
pub struct SoapClient {
    client: Client,
    settings: SoapSettings,
    seller_id: OnceCell<String>,
}

impl SoapClient {
    pub fn new(settings: SoapSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self {
            client,
            settings,
            seller_id: OnceCell::new(),
        })
    }

    pub fn settings(&self) -> &SoapSettings {
        &self.settings
    }

    /// 呼叫端沒帶 su/sp 時補上設定檔中的帳密
    fn with_credentials(&self, mut params: Map<String, Value>) -> Map<String, Value> {
        if let Some(user) = &self.settings.service_user {
            params
                .entry(SERVICE_USER_PARAM)
                .or_insert_with(|| Value::String(user.clone()));
        }
        if let Some(password) = &self.settings.service_password {
            params
                .entry(SERVICE_PASSWORD_PARAM)
                .or_insert_with(|| Value::String(password.clone()));
        }
        params
    }

    /// A single envelope round trip without any status handling.
    pub async fn invoke(&self, operation: &str, params: &Map<String, Value>) -> Result<Value> {
        let envelope = build_envelope(operation, &self.settings.namespace, params)?;
        tracing::debug!("📡 {}: POST {} ({} bytes)", operation, self.settings.endpoint, envelope.len());

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", soap_action(operation, &self.settings.namespace))
            .body(envelope)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!("📡 {}: HTTP {} ({} bytes)", operation, status, body.len());

        // Fault 優先於 HTTP 狀態碼（asmx 以 500 回傳 Fault）
        match parse_response(operation, &body) {
            Ok(result) if status.is_success() => Ok(result),
            Err(fault @ ProxyError::SoapFault { .. }) => {
                tracing::warn!("⚠️ {}: SOAP fault: {}", operation, fault);
                Err(fault)
            }
            Ok(_) | Err(_) if !status.is_success() => Err(ProxyError::UpstreamHttp {
                operation: operation.to_string(),
                status: status.as_u16(),
            }),
            other => other,
        }
    }

    async fn seller_id(&self) -> Result<String> {
        self.seller_id
            .get_or_try_init(|| async {
                if let Some(id) = &self.settings.seller_un_id {
                    return Ok::<String, ProxyError>(id.clone());
                }

                tracing::info!("🔑 Resolving seller id via chek_service_user");
                let params = self.with_credentials(Map::new());
                let result = self.invoke("chek_service_user", &params).await?;

                let valid = result
                    .get("chek_service_userResult")
                    .and_then(value_text)
                    .is_some_and(|v| v.eq_ignore_ascii_case("true"));
                let un_id = result
                    .get("un_id")
                    .and_then(value_text)
                    .filter(|id| id.parse::<i64>().is_ok_and(|n| n > 0));

                match (valid, un_id) {
                    (true, Some(id)) => Ok(id),
                    _ => Err(ProxyError::ServiceStatus {
                        operation: "chek_service_user".to_string(),
                        code: SELLER_ID_REQUIRED,
                    }),
                }
            })
            .await
            .cloned()
    }

    async fn invoke_with_seller_retry(
        &self,
        operation: &str,
        mut params: Map<String, Value>,
    ) -> Result<(Map<String, Value>, Value)> {
        let result = self.invoke(operation, &params).await?;
        if status_code(&result) != Some(SELLER_ID_REQUIRED) {
            return Ok((params, result));
        }

        let param = self.settings.seller_id_param.clone();
        if params.contains_key(&param) {
            return Err(ProxyError::ServiceStatus {
                operation: operation.to_string(),
                code: SELLER_ID_REQUIRED,
            });
        }

        let seller_id = self.seller_id().await?;
        tracing::info!("🔁 {}: status {}, retrying with {}", operation, SELLER_ID_REQUIRED, param);
        params.insert(param, Value::String(seller_id));

        let result = self.invoke(operation, &params).await?;
        if status_code(&result) == Some(SELLER_ID_REQUIRED) {
            return Err(ProxyError::ServiceStatus {
                operation: operation.to_string(),
                code: SELLER_ID_REQUIRED,
            });
        }
        Ok((params, result))
    }

    async fn call_in_chunks(&self, operation: &str, params: &Map<String, Value>) -> Result<Value> {
        let hours = self.settings.chunk_hours;
        let range = find_date_range(params)
            .filter(|range| exceeds_window(range, hours))
            .ok_or_else(|| ProxyError::ServiceStatus {
                operation: operation.to_string(),
                code: DATE_RANGE_TOO_LARGE,
            })?;

        let windows = split_windows(range.start, range.end, hours);
        tracing::info!(
            "✂️ {}: status {}, splitting {} into {} windows of {}h",
            operation,
            DATE_RANGE_TOO_LARGE,
            range.start_param,
            windows.len(),
            hours
        );

        let sub_params: Vec<Map<String, Value>> = windows
            .iter()
            .map(|window| params_for_window(params, &range, window))
            .collect();

        let results: Vec<Value> = stream::iter(sub_params)
            .map(|sub_params| self.invoke_window(operation, sub_params))
            .buffered(self.settings.chunk_concurrency.max(1))
            .try_collect()
            .await?;

        Ok(concat_results(results))
    }

    async fn invoke_window(&self, operation: &str, params: Map<String, Value>) -> Result<Value> {
        let result = self.invoke(operation, &params).await?;
        match status_code(&result) {
            Some(code @ (SELLER_ID_REQUIRED | DATE_RANGE_TOO_LARGE)) => {
                Err(ProxyError::ServiceStatus {
                    operation: operation.to_string(),
                    code,
                })
            }
            _ => Ok(result),
        }
    }
}

#[async_trait]
impl RsService for SoapClient {
    async fn call(&self, operation: &str, params: Map<String, Value>) -> Result<Value> {
        let params = self.with_credentials(params);
        let (params, result) = self.invoke_with_seller_retry(operation, params).await?;

        match status_code(&result) {
            Some(DATE_RANGE_TOO_LARGE) => self.call_in_chunks(operation, &params).await,
            _ => Ok(result),
        }
    }
}
