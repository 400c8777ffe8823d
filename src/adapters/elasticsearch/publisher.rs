use super::client::ElasticsearchClient;
use crate::adapters::filesystem::FileMode;
use crate::config::job_config::{ConfigEntries, ConfigMap};
use crate::domain::ports::{PublishSummary, Publisher};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

pub const SCOPE: &str = "publisher.elasticsearch";
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

#[derive(Debug, Clone)]
pub struct ElasticsearchPublisherConfig {
    pub file_path: PathBuf,
    pub mode: FileMode,
    /// `None` when no search host was configured; rejected by validation.
    pub client: Option<ElasticsearchClient>,
    pub new_index: String,
    /// Kept for reference only; Elasticsearch 7+ rejects mapping types in bulk requests.
    pub doc_type: String,
    pub mapping: Value,
    pub alias: String,
    pub batch_size: usize,
}

impl Validate for ElasticsearchPublisherConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path(&format!("{SCOPE}.file_path"), &self.file_path.to_string_lossy())?;
        if self.mode != FileMode::Read {
            return Err(EtlError::InvalidConfigValueError {
                field: format!("{SCOPE}.mode"),
                value: self.mode.as_str().to_string(),
                reason: "Publisher only reads the staged file".to_string(),
            });
        }

        if self.client.is_none() {
            return Err(EtlError::missing(format!("{SCOPE}.client")));
        }

        validation::validate_non_empty_string(&format!("{SCOPE}.new_index"), &self.new_index)?;
        if self.new_index != self.new_index.to_lowercase()
            || self.new_index.starts_with(['_', '-', '+'])
        {
            return Err(EtlError::InvalidConfigValueError {
                field: format!("{SCOPE}.new_index"),
                value: self.new_index.clone(),
                reason: "Index names must be lowercase and not start with _, - or +".to_string(),
            });
        }

        validation::validate_non_empty_string(&format!("{SCOPE}.doc_type"), &self.doc_type)?;
        validation::validate_non_empty_string(&format!("{SCOPE}.alias"), &self.alias)?;
        if self.alias == self.new_index {
            return Err(EtlError::InvalidConfigValueError {
                field: format!("{SCOPE}.alias"),
                value: self.alias.clone(),
                reason: "Alias must differ from the index name".to_string(),
            });
        }
        if !self.mapping.is_object() {
            return Err(EtlError::InvalidConfigValueError {
                field: format!("{SCOPE}.mapping"),
                value: self.mapping.to_string(),
                reason: "Mapping must be a JSON object".to_string(),
            });
        }
        validation::validate_positive_number(&format!("{SCOPE}.batch_size"), self.batch_size, 1)?;
        Ok(())
    }
}

impl ConfigEntries for ElasticsearchPublisherConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        map.insert_scoped(SCOPE, "file_path", self.file_path.to_string_lossy().into_owned())?;
        map.insert_scoped(SCOPE, "mode", self.mode.as_str())?;
        if let Some(client) = &self.client {
            map.insert_scoped(SCOPE, "client", client.base_url())?;
        }
        map.insert_scoped(SCOPE, "new_index", self.new_index.as_str())?;
        map.insert_scoped(SCOPE, "doc_type", self.doc_type.as_str())?;
        map.insert_scoped(SCOPE, "mapping", self.mapping.clone())?;
        map.insert_scoped(SCOPE, "alias", self.alias.as_str())?;
        map.insert_scoped(SCOPE, "batch_size", self.batch_size)?;
        Ok(map)
    }
}

/// 建立新 index、批次上傳文件，最後把 alias 原子性地切換到新 index
pub struct ElasticsearchPublisher {
    config: ElasticsearchPublisherConfig,
}

impl ElasticsearchPublisher {
    pub fn new(config: ElasticsearchPublisherConfig) -> Self {
        Self { config }
    }

    /// One JSON document per non-blank line of the staging file.
    fn read_documents(&self) -> Result<Vec<Value>> {
        let content = fs::read_to_string(&self.config.file_path)?;
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| -> Result<Value> { Ok(serde_json::from_str(line)?) })
            .collect()
    }

    fn alias_actions(&self, old_indices: &[String]) -> Vec<Value> {
        let mut actions = vec![json!({
            "add": { "index": self.config.new_index, "alias": self.config.alias }
        })];
        actions.extend(
            old_indices
                .iter()
                .filter(|index| **index != self.config.new_index)
                .map(|index| json!({ "remove_index": { "index": index } })),
        );
        actions
    }
}

#[async_trait]
impl Publisher for ElasticsearchPublisher {
    async fn publish(&self) -> Result<PublishSummary> {
        let documents = self.read_documents()?;
        if documents.is_empty() {
            tracing::warn!(
                "⚠️ No documents in {}, leaving alias {} untouched",
                self.config.file_path.display(),
                self.config.alias
            );
            return Ok(PublishSummary::default());
        }

        let client = self
            .config
            .client
            .as_ref()
            .ok_or_else(|| EtlError::missing(format!("{SCOPE}.client")))?;
        let old_indices = client.indices_for_alias(&self.config.alias).await?;
        tracing::debug!("Alias {} currently points at {:?}", self.config.alias, old_indices);

        client
            .create_index(&self.config.new_index, &self.config.mapping)
            .await?;

        let mut uploaded = 0;
        for chunk in documents.chunks(self.config.batch_size) {
            uploaded += client.bulk(&self.config.new_index, chunk.to_vec()).await?;
        }

        client
            .update_aliases(self.alias_actions(&old_indices))
            .await?;

        tracing::info!(
            "🔀 Uploaded {} document(s) to {} and moved alias {} (replaced {} index(es))",
            uploaded,
            self.config.new_index,
            self.config.alias,
            old_indices.len()
        );
        Ok(PublishSummary {
            documents: uploaded,
            ..Default::default()
        })
    }

    fn scope(&self) -> &str {
        SCOPE
    }
}
