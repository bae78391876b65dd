use crate::core::chunking::DEFAULT_CHUNK_HOURS;
use crate::core::envelope::DEFAULT_NAMESPACE;
use crate::core::operations::OperationAllowList;
use crate::core::soap_client::{SoapSettings, DEFAULT_SELLER_ID_PARAM};
use crate::utils::error::{ProxyError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://services.rs.ge/WayBillService/WayBillService.asmx";

/// 未指定設定檔時使用
pub const DEFAULT_CONFIG: &str = r#"
[server]
bind = "0.0.0.0:3001"

[upstream]
endpoint = "https://services.rs.ge/WayBillService/WayBillService.asmx"

[credentials]
service_user = "${RS_SERVICE_USER}"
service_password = "${RS_SERVICE_PASSWORD}"
"#;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub operations: OperationsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub endpoint: String,
    pub namespace: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            namespace: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub service_user: Option<String>,
    pub service_password: Option<String>,
    pub seller_un_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    pub seller_id_param: Option<String>,
    pub chunk_hours: Option<i64>,
    pub chunk_concurrency: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationsConfig {
    pub allowed: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: Option<String>,
    pub report_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportsConfig {
    pub detail_batch_size: Option<usize>,
    pub batch_delay_ms: Option<u64>,
}

impl ProxyConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ProxyError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ProxyError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 有指定路徑就讀檔，否則用內建預設值
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::from_toml_str(DEFAULT_CONFIG),
        }
    }

    /// 替換環境變數 (例如 ${RS_SERVICE_USER})；未設定者保留原字串
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("upstream.endpoint", &self.upstream.endpoint)?;

        self.bind_addr()?;

        if let Some(namespace) = &self.upstream.namespace {
            validate_non_empty_string("upstream.namespace", namespace)?;
        }
        if let Some(param) = &self.retry.seller_id_param {
            validate_non_empty_string("retry.seller_id_param", param)?;
        }
        if let Some(hours) = self.retry.chunk_hours {
            validate_range("retry.chunk_hours", hours, 1, 24 * 31)?;
        }
        if let Some(concurrency) = self.retry.chunk_concurrency {
            validate_positive_number("retry.chunk_concurrency", concurrency, 1)?;
        }
        if let Some(batch) = self.reports.detail_batch_size {
            validate_positive_number("reports.detail_batch_size", batch, 1)?;
        }
        if let Some(dir) = &self.storage.data_dir {
            validate_path("storage.data_dir", dir)?;
        }
        if let Some(dir) = &self.storage.report_dir {
            validate_path("storage.report_dir", dir)?;
        }
        if let Some(allowed) = &self.operations.allowed {
            if allowed.is_empty() {
                return Err(ProxyError::InvalidConfigValueError {
                    field: "operations.allowed".to_string(),
                    value: "[]".to_string(),
                    reason: "At least one operation must be allowed".to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| ProxyError::InvalidConfigValueError {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: format!("{}", e),
            })
    }

    pub fn service_user(&self) -> Option<&str> {
        resolved(self.credentials.service_user.as_deref())
    }

    pub fn service_password(&self) -> Option<&str> {
        resolved(self.credentials.service_password.as_deref())
    }

    pub fn soap_settings(&self) -> SoapSettings {
        let mut settings = SoapSettings::new(self.upstream.endpoint.clone());
        settings.namespace = self
            .upstream
            .namespace
            .clone()
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        settings.timeout = Duration::from_secs(self.upstream.timeout_seconds.unwrap_or(60));
        settings.service_user = self.service_user().map(str::to_string);
        settings.service_password = self.service_password().map(str::to_string);
        settings.seller_un_id = resolved(self.credentials.seller_un_id.as_deref()).map(str::to_string);
        settings.seller_id_param = self
            .retry
            .seller_id_param
            .clone()
            .unwrap_or_else(|| DEFAULT_SELLER_ID_PARAM.to_string());
        settings.chunk_hours = self.retry.chunk_hours.unwrap_or(DEFAULT_CHUNK_HOURS);
        settings.chunk_concurrency = self.retry.chunk_concurrency.unwrap_or(4);
        settings
    }

    pub fn allow_list(&self) -> OperationAllowList {
        match &self.operations.allowed {
            Some(allowed) => OperationAllowList::new(allowed.iter().cloned()),
            None => OperationAllowList::default(),
        }
    }

    pub fn data_dir(&self) -> Option<&str> {
        self.storage.data_dir.as_deref()
    }

    pub fn report_dir(&self) -> &str {
        self.storage.report_dir.as_deref().unwrap_or("./reports")
    }

    pub fn detail_batch_size(&self) -> usize {
        self.reports.detail_batch_size.unwrap_or(5)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.reports.batch_delay_ms.unwrap_or(250))
    }
}

/// 空字串與未替換的 ${VAR} 都視為未設定
fn resolved(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !ENV_VAR_RE.is_match(v))
}

impl Validate for ProxyConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[server]
bind = "127.0.0.1:8080"

[upstream]
endpoint = "https://services.rs.ge/WayBillService/WayBillService.asmx"
timeout_seconds = 30

[credentials]
service_user = "svc:204567890"
service_password = "secret"
seller_un_id = "731937"

[retry]
chunk_hours = 48
chunk_concurrency = 2

[operations]
allowed = ["get_waybills", "get_waybill"]

[storage]
data_dir = "./data"

[reports]
detail_batch_size = 10
batch_delay_ms = 100
"#;

        let config = ProxyConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr().unwrap().port(), 8080);

        let settings = config.soap_settings();
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.service_user.as_deref(), Some("svc:204567890"));
        assert_eq!(settings.seller_un_id.as_deref(), Some("731937"));
        assert_eq!(settings.chunk_hours, 48);
        assert_eq!(settings.namespace, DEFAULT_NAMESPACE);

        let allow_list = config.allow_list();
        assert!(allow_list.is_allowed("get_waybill"));
        assert!(!allow_list.is_allowed("get_buyer_waybills"));

        assert_eq!(config.detail_batch_size(), 10);
        assert_eq!(config.batch_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ProxyConfig::from_toml_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.soap_settings().chunk_hours, 72);
        assert_eq!(config.detail_batch_size(), 5);
        assert!(config.data_dir().is_none());
        assert!(config.allow_list().is_allowed("get_waybills"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("RS_PROXY_TEST_USER", "env-user");

        let toml_content = r#"
[credentials]
service_user = "${RS_PROXY_TEST_USER}"
service_password = "${RS_PROXY_TEST_UNSET_PASSWORD}"
"#;

        let config = ProxyConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.service_user(), Some("env-user"));
        assert_eq!(config.service_password(), None);

        std::env::remove_var("RS_PROXY_TEST_USER");
    }

    #[test]
    fn test_config_validation_errors() {
        let bad_url = ProxyConfig::from_toml_str("[upstream]\nendpoint = \"invalid-url\"").unwrap();
        assert!(bad_url.validate().is_err());

        let bad_bind = ProxyConfig::from_toml_str("[server]\nbind = \"nowhere\"").unwrap();
        assert!(bad_bind.validate().is_err());

        let bad_hours = ProxyConfig::from_toml_str("[retry]\nchunk_hours = 0").unwrap();
        assert!(bad_hours.validate().is_err());

        let no_ops = ProxyConfig::from_toml_str("[operations]\nallowed = []").unwrap();
        assert!(no_ops.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = ProxyConfig::from_toml_str("[server\nbind=").unwrap_err();
        assert!(matches!(err, ProxyError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[server]\nbind = \"127.0.0.1:4000\"\n")
            .unwrap();

        let config = ProxyConfig::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:4000");

        let defaults = ProxyConfig::load(None).unwrap();
        assert_eq!(defaults.server.bind, "0.0.0.0:3001");
    }
}
