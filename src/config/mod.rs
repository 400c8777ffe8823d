#[cfg(feature = "cli")]
pub mod cli;
pub mod job_config;

use crate::adapters::bigquery::DEFAULT_API_BASE_URL;
use crate::adapters::elasticsearch::client::DEFAULT_PORT;
use crate::adapters::elasticsearch::ElasticsearchClient;
use crate::adapters::neo4j::client::DEFAULT_DATABASE;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use job_config::{ConfigEntries, ConfigMap};

pub const DEFAULT_PROJECT_ID: &str = "project_id";
pub const DEFAULT_METADATA_TYPE: &str = "bigquery_metadata";
pub const DEFAULT_STAGING_ROOT: &str = "/var/tmp/amundsen";
/// 每個 HTTP 請求（BigQuery、Elasticsearch）的逾時秒數
pub const REQUEST_TIMEOUT_SECONDS: u64 = 60;

/// 環境變數名稱
pub mod env {
    pub const ELASTICSEARCH_HOST: &str = "ELASTICSEARCH_HOST";
    pub const ELASTICSEARCH_PORT: &str = "ELASTICSEARCH_PORT";
    /// Misspelled names still exported by older deployments.
    pub const LEGACY_ELASTICSEARCH_HOST: &str = "ELASTICHSEARCH_HOST";
    pub const LEGACY_ELASTICSEARCH_PORT: &str = "ELASTICHSEARCH_PORT";
    pub const NEO4J_USERNAME: &str = "NEO4J_USERNAME";
    pub const NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";
    pub const NEO4J_ENDPOINT: &str = "NEO4J_ENDPOINT";
    pub const NEO4J_DATABASE: &str = "NEO4J_DATABASE";
    pub const BIGQUERY_PROJECT_ID: &str = "BIGQUERY_PROJECT_ID";
    pub const BIGQUERY_ACCESS_TOKEN: &str = "BIGQUERY_ACCESS_TOKEN";
    pub const BIGQUERY_API_BASE: &str = "BIGQUERY_API_BASE";
    pub const STAGING_ROOT: &str = "AMUNDSEN_STAGING_ROOT";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElasticsearchSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jSettings {
    pub endpoint: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BigQuerySettings {
    pub project_id: Option<String>,
    pub access_token: Option<String>,
    pub api_base: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingSettings {
    pub root: Option<PathBuf>,
    pub metadata_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    pub publish_tag: Option<String>,
}

/// Raw process settings, from the environment and/or a TOML file. Every field is optional
/// here; required values are enforced when each job validates its configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub elasticsearch: ElasticsearchSettings,
    pub neo4j: Neo4jSettings,
    pub bigquery: BigQuerySettings,
    pub staging: StagingSettings,
    pub job: JobSettings,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_port(field: &str, raw: Option<String>) -> Result<Option<u16>> {
    raw.map(|value| {
        value
            .trim()
            .parse::<u16>()
            .map_err(|e| EtlError::InvalidConfigValueError {
                field: field.to_string(),
                value,
                reason: e.to_string(),
            })
    })
    .transpose()
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 以任意查詢函式取代 `std::env::var`，方便測試
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let host = get(env::ELASTICSEARCH_HOST).or_else(|| get(env::LEGACY_ELASTICSEARCH_HOST));
        let port = match get(env::ELASTICSEARCH_PORT) {
            Some(port) => parse_port(env::ELASTICSEARCH_PORT, Some(port))?,
            None => parse_port(
                env::LEGACY_ELASTICSEARCH_PORT,
                get(env::LEGACY_ELASTICSEARCH_PORT),
            )?,
        };

        Ok(Self {
            elasticsearch: ElasticsearchSettings { host, port },
            neo4j: Neo4jSettings {
                endpoint: get(env::NEO4J_ENDPOINT),
                username: get(env::NEO4J_USERNAME),
                password: get(env::NEO4J_PASSWORD),
                database: get(env::NEO4J_DATABASE),
            },
            bigquery: BigQuerySettings {
                project_id: get(env::BIGQUERY_PROJECT_ID),
                access_token: get(env::BIGQUERY_ACCESS_TOKEN),
                api_base: get(env::BIGQUERY_API_BASE),
            },
            staging: StagingSettings {
                root: get(env::STAGING_ROOT).map(PathBuf::from),
                metadata_type: None,
            },
            job: JobSettings::default(),
        })
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置，`${VAR}` 會以環境變數替換
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content, |key| std::env::var(key).ok());
        let config: Self = toml::from_str(&processed)?;
        Ok(config.normalized())
    }

    /// Values set in `self` win; anything left unset is taken from `fallback`.
    pub fn or(self, fallback: IngestConfig) -> IngestConfig {
        IngestConfig {
            elasticsearch: ElasticsearchSettings {
                host: self.elasticsearch.host.or(fallback.elasticsearch.host),
                port: self.elasticsearch.port.or(fallback.elasticsearch.port),
            },
            neo4j: Neo4jSettings {
                endpoint: self.neo4j.endpoint.or(fallback.neo4j.endpoint),
                username: self.neo4j.username.or(fallback.neo4j.username),
                password: self.neo4j.password.or(fallback.neo4j.password),
                database: self.neo4j.database.or(fallback.neo4j.database),
            },
            bigquery: BigQuerySettings {
                project_id: self.bigquery.project_id.or(fallback.bigquery.project_id),
                access_token: self.bigquery.access_token.or(fallback.bigquery.access_token),
                api_base: self.bigquery.api_base.or(fallback.bigquery.api_base),
            },
            staging: StagingSettings {
                root: self.staging.root.or(fallback.staging.root),
                metadata_type: self.staging.metadata_type.or(fallback.staging.metadata_type),
            },
            job: JobSettings {
                publish_tag: self.job.publish_tag.or(fallback.job.publish_tag),
            },
        }
    }

    fn normalized(self) -> Self {
        IngestConfig {
            elasticsearch: ElasticsearchSettings {
                host: non_blank(self.elasticsearch.host),
                port: self.elasticsearch.port,
            },
            neo4j: Neo4jSettings {
                endpoint: non_blank(self.neo4j.endpoint),
                username: non_blank(self.neo4j.username),
                password: non_blank(self.neo4j.password),
                database: non_blank(self.neo4j.database),
            },
            bigquery: BigQuerySettings {
                project_id: non_blank(self.bigquery.project_id),
                access_token: non_blank(self.bigquery.access_token),
                api_base: non_blank(self.bigquery.api_base),
            },
            staging: StagingSettings {
                root: self.staging.root.filter(|p| !p.as_os_str().is_empty()),
                metadata_type: non_blank(self.staging.metadata_type),
            },
            job: JobSettings {
                publish_tag: non_blank(self.job.publish_tag),
            },
        }
    }

    /// 建立兩個 job 共用的參數；缺少的必填值留到各 job 驗證時才報錯
    pub fn into_params(self) -> Result<JobParams> {
        let search_client = match &self.elasticsearch.host {
            Some(host) => Some(ElasticsearchClient::try_new(
                host,
                self.elasticsearch.port.unwrap_or(DEFAULT_PORT),
            )?),
            None => None,
        };

        Ok(JobParams {
            project_id: self
                .bigquery
                .project_id
                .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
            metadata_type: self
                .staging
                .metadata_type
                .unwrap_or_else(|| DEFAULT_METADATA_TYPE.to_string()),
            neo4j_endpoint: self.neo4j.endpoint,
            neo4j_user: self.neo4j.username,
            neo4j_password: self.neo4j.password,
            neo4j_database: self
                .neo4j
                .database
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            publish_tag: self.job.publish_tag.unwrap_or_else(today_publish_tag),
            staging_root: self
                .staging
                .root
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_ROOT)),
            search_client,
            bigquery_access_token: self.bigquery.access_token,
            bigquery_api_base: self
                .bigquery
                .api_base
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        })
    }
}

/// Publish tag for runs started today, `YYYY-MM-DD` in local time.
pub fn today_publish_tag() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// 替換 `${VAR_NAME}`；找不到的變數替換為空字串
fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    let re = PLACEHOLDER
        .get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

    re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        lookup(var_name).unwrap_or_else(|| {
            tracing::warn!("⚠️ Environment variable {} is not set", var_name);
            String::new()
        })
    })
    .into_owned()
}

/// 兩個 job 共用、建構一次後不再變動的參數
#[derive(Debug, Clone)]
pub struct JobParams {
    pub project_id: String,
    pub metadata_type: String,
    pub neo4j_endpoint: Option<String>,
    pub neo4j_user: Option<String>,
    pub neo4j_password: Option<String>,
    pub neo4j_database: String,
    pub publish_tag: String,
    pub staging_root: PathBuf,
    pub search_client: Option<ElasticsearchClient>,
    pub bigquery_access_token: Option<String>,
    pub bigquery_api_base: String,
}
