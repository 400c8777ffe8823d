use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Neo4j error: {0}")]
    GraphError(#[from] neo4rs::Error),

    #[error("Elasticsearch error: {0}")]
    SearchError(#[from] opensearch::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{service} returned {status}: {message}")]
    RemoteServiceError {
        service: String,
        status: u16,
        message: String,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

impl EtlError {
    pub fn processing(message: impl Into<String>) -> Self {
        Self::ProcessingError {
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingConfigError {
            field: field.into(),
        }
    }

    /// 是否為執行前即可偵測的配置錯誤
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. }
                | Self::MissingConfigError { .. }
                | Self::InvalidConfigValueError { .. }
                | Self::TomlError(_)
        )
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingConfigError { field } => {
                format!("Set {} (see the environment variables listed in --help)", field)
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Check the value configured for {}", field)
            }
            Self::ConfigError { .. } | Self::TomlError(_) => {
                "Check the configuration file syntax and referenced variables".to_string()
            }
            Self::ApiError(_) | Self::SearchError(_) => {
                "Check network connectivity and that the endpoint is reachable".to_string()
            }
            Self::GraphError(_) => {
                "Check NEO4J_ENDPOINT (bolt://host:7687) and the Neo4j credentials".to_string()
            }
            Self::RemoteServiceError { service, status, .. } if *status == 401 || *status == 403 => {
                format!("Check the credentials used for {}", service)
            }
            Self::RemoteServiceError { service, .. } => {
                format!("Inspect the {} logs for the rejected request", service)
            }
            Self::IoError(_) | Self::CsvError(_) => {
                "Check that the staging directories are writable".to_string()
            }
            Self::SerializationError(_) | Self::ProcessingError { .. } => {
                "Re-run with --verbose to see the offending record".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
