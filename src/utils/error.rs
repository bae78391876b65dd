use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("XML parsing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{message}")]
    SoapFault { code: String, message: String },

    #[error("Upstream returned HTTP {status} for {operation}")]
    UpstreamHttp { operation: String, status: u16 },

    #[error("Service returned status {code} for {operation}")]
    ServiceStatus { operation: String, code: i64 },

    #[error("Operation not allowed: {operation}")]
    OperationNotAllowed { operation: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Upstream,
    Request,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ProxyError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProxyError::ApiError(_) => ErrorCategory::Network,
            ProxyError::SoapFault { .. }
            | ProxyError::UpstreamHttp { .. }
            | ProxyError::ServiceStatus { .. } => ErrorCategory::Upstream,
            ProxyError::OperationNotAllowed { .. }
            | ProxyError::InvalidRequest { .. }
            | ProxyError::NotFound { .. } => ErrorCategory::Request,
            ProxyError::ConfigError { .. }
            | ProxyError::ConfigValidationError { .. }
            | ProxyError::InvalidConfigValueError { .. }
            | ProxyError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ProxyError::XmlError(_)
            | ProxyError::CsvError(_)
            | ProxyError::SerializationError(_)
            | ProxyError::ProcessingError { .. }
            | ProxyError::ValidationError { .. } => ErrorCategory::Data,
            ProxyError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Request => ErrorSeverity::Low,
            ErrorCategory::Network | ErrorCategory::Upstream => ErrorSeverity::Medium,
            ErrorCategory::Data | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 給使用者的處理建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ProxyError::ApiError(_) => "Check network connectivity to the RS.ge service and retry",
            ProxyError::SoapFault { .. } => "Check the operation parameters against the service definition",
            ProxyError::UpstreamHttp { .. } => "The upstream service is unavailable, retry later",
            ProxyError::ServiceStatus { code: -101, .. } => {
                "Set credentials.seller_un_id or verify the service user credentials"
            }
            ProxyError::ServiceStatus { code: -1064, .. } => {
                "Narrow the requested date range or supply a create_date_s/create_date_e pair"
            }
            ProxyError::ServiceStatus { .. } => "Look up the status code with get_error_codes",
            ProxyError::OperationNotAllowed { .. } => "Use one of the operations in the allow-list",
            ProxyError::InvalidRequest { .. } => "Send a JSON object whose keys are valid XML element names",
            ProxyError::NotFound { .. } => "Store the document before reading it",
            ProxyError::ConfigError { .. }
            | ProxyError::ConfigValidationError { .. }
            | ProxyError::InvalidConfigValueError { .. }
            | ProxyError::MissingConfigError { .. } => "Fix the configuration file and restart",
            ProxyError::IoError(_) => "Check file permissions and available disk space",
            ProxyError::XmlError(_)
            | ProxyError::CsvError(_)
            | ProxyError::SerializationError(_)
            | ProxyError::ProcessingError { .. }
            | ProxyError::ValidationError { .. } => "Inspect the input data for malformed values",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the tax service: {}", self),
            ErrorCategory::Upstream => format!("The tax service rejected the request: {}", self),
            ErrorCategory::Request => format!("Request rejected: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Data => format!("Could not process data: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
