use crate::adapters::bigquery::{BigQueryExtractorConfig, BigQueryMetadataExtractor, DEFAULT_PAGE_SIZE};
use crate::adapters::filesystem::{FsNeo4jCsvLoader, FsNeo4jCsvLoaderConfig};
use crate::adapters::neo4j::csv_publisher::DEFAULT_TRANSACTION_SIZE;
use crate::adapters::neo4j::{CypherRunner, Neo4jCsvPublisher, Neo4jCsvPublisherConfig};
use crate::config::job_config::{ConfigEntries, ConfigMap};
use crate::config::JobParams;
use crate::core::{DefaultTask, Job, Publisher};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Only datasets labelled `type:csv` are extracted.
pub const DATASET_LABEL_FILTER: &str = "labels.type:csv";

/// `<root>/<metadata_type>/nodes` and `<root>/<metadata_type>/relationships`
pub fn staging_dirs(root: &Path, metadata_type: &str) -> (PathBuf, PathBuf) {
    let base = root.join(metadata_type);
    (base.join("nodes"), base.join("relationships"))
}

#[derive(Debug, Clone, PartialEq)]
pub struct BigQueryToNeo4jJobConfig {
    pub extractor: BigQueryExtractorConfig,
    pub loader: FsNeo4jCsvLoaderConfig,
    pub publisher: Neo4jCsvPublisherConfig,
}

impl Validate for BigQueryToNeo4jJobConfig {
    fn validate(&self) -> Result<()> {
        self.extractor.validate()?;
        self.loader.validate()?;
        self.publisher.validate()?;

        // 發布端必須讀 loader 寫出的同一組目錄
        if self.loader.node_dir != self.publisher.node_files_dir
            || self.loader.relationship_dir != self.publisher.relation_files_dir
        {
            return Err(EtlError::ConfigError {
                message: "loader and publisher staging directories differ".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigEntries for BigQueryToNeo4jJobConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = self.extractor.entries()?;
        map.merge(self.loader.entries()?)?;
        map.merge(self.publisher.entries()?)?;
        Ok(map)
    }
}

/// BigQuery table metadata → staging CSV → Neo4j
#[derive(Clone)]
pub struct BigQueryToNeo4jJob {
    config: BigQueryToNeo4jJobConfig,
    graph: Option<Arc<dyn CypherRunner>>,
}

impl BigQueryToNeo4jJob {
    pub fn new(params: &JobParams) -> Self {
        let (node_dir, relationship_dir) = staging_dirs(&params.staging_root, &params.metadata_type);

        let config = BigQueryToNeo4jJobConfig {
            extractor: BigQueryExtractorConfig {
                project_id: params.project_id.clone(),
                filter: Some(DATASET_LABEL_FILTER.to_string()),
                page_size: DEFAULT_PAGE_SIZE,
                api_base_url: params.bigquery_api_base.clone(),
                access_token: params.bigquery_access_token.clone(),
            },
            loader: FsNeo4jCsvLoaderConfig {
                node_dir: node_dir.clone(),
                relationship_dir: relationship_dir.clone(),
                delete_created_dirs: true,
            },
            publisher: Neo4jCsvPublisherConfig {
                node_files_dir: node_dir,
                relation_files_dir: relationship_dir,
                connection: super::neo4j_connection(params),
                publish_tag: params.publish_tag.clone(),
                transaction_size: DEFAULT_TRANSACTION_SIZE,
            },
        };

        Self {
            config,
            graph: None,
        }
    }

    /// Publishes through `graph` instead of a Bolt pool opened from the job parameters.
    pub fn with_graph(mut self, graph: Arc<dyn CypherRunner>) -> Self {
        self.graph = Some(graph);
        self
    }
}

impl Job for BigQueryToNeo4jJob {
    const NAME: &'static str = "bigquery_to_neo4j";

    type Config = BigQueryToNeo4jJobConfig;

    fn config(&self) -> Self::Config {
        self.config.clone()
    }

    fn task(&self, config: &Self::Config) -> Result<DefaultTask> {
        Ok(DefaultTask::new(
            Box::new(BigQueryMetadataExtractor::new(config.extractor.clone())?),
            Box::new(FsNeo4jCsvLoader::new(config.loader.clone())),
        ))
    }

    fn publisher(&self, config: &Self::Config) -> Result<Box<dyn Publisher>> {
        let publisher = Neo4jCsvPublisher::new(config.publisher.clone());
        Ok(Box::new(match &self.graph {
            Some(graph) => publisher.with_graph(graph.clone()),
            None => publisher,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::core::Launch;

    fn params() -> JobParams {
        let mut params = IngestConfig::default().into_params().unwrap();
        params.neo4j_endpoint = Some("bolt://localhost:7687".to_string());
        params.neo4j_user = Some("neo4j".to_string());
        params.neo4j_password = Some("secret".to_string());
        params.publish_tag = "2024-05-01".to_string();
        params
    }

    #[test]
    fn test_staging_dirs_follow_metadata_type() {
        let (nodes, relationships) = staging_dirs(Path::new("/var/tmp/amundsen"), "bigquery_metadata");
        assert_eq!(nodes, PathBuf::from("/var/tmp/amundsen/bigquery_metadata/nodes"));
        assert_eq!(
            relationships,
            PathBuf::from("/var/tmp/amundsen/bigquery_metadata/relationships")
        );
    }

    #[test]
    fn test_config_entries() {
        let job = BigQueryToNeo4jJob::new(&params());
        let entries = job.describe().unwrap();

        assert!(entries.empty_keys().is_empty(), "{:?}", entries.empty_keys());
        assert_eq!(
            entries.get_str("extractor.bigquery_table_metadata.filter_key"),
            Some("labels.type:csv")
        );
        assert_eq!(
            entries.get_str("extractor.bigquery_table_metadata.project_id_key"),
            Some("project_id")
        );
        assert_eq!(
            entries.get("loader.filesystem_csv_neo4j.delete_created_directories"),
            Some(&serde_json::json!(true))
        );
        assert_eq!(
            entries.get("publisher.neo4j.neo4j_validate_ssl"),
            Some(&serde_json::json!(false))
        );
        assert_eq!(entries.get_str("publisher.neo4j.neo4j_password"), Some("******"));
        assert_eq!(entries.get_str("publisher.neo4j.job_publish_tag"), Some("2024-05-01"));

        assert_eq!(
            entries.get("loader.filesystem_csv_neo4j.node_dir_path"),
            entries.get("publisher.neo4j.node_files_directory")
        );
        assert_eq!(
            entries.get("loader.filesystem_csv_neo4j.relationship_dir_path"),
            entries.get("publisher.neo4j.relation_files_directory")
        );
    }

    #[test]
    fn test_config_is_pure_function_of_params() {
        let params = params();
        assert_eq!(
            BigQueryToNeo4jJob::new(&params).config(),
            BigQueryToNeo4jJob::new(&params).config()
        );
    }

    #[test]
    fn test_missing_endpoint_fails_validation() {
        let mut params = params();
        params.neo4j_endpoint = None;
        let job = BigQueryToNeo4jJob::new(&params);

        assert!(matches!(
            job.config().validate(),
            Err(EtlError::MissingConfigError { field }) if field == "publisher.neo4j.neo4j_endpoint"
        ));
    }

    #[test]
    fn test_bolt_endpoint_validates() {
        let mut params = params();
        params.neo4j_endpoint = Some("neo4j://graph.internal:7687".to_string());
        assert!(BigQueryToNeo4jJob::new(&params).validate().is_ok());

        params.neo4j_endpoint = Some("http://graph.internal:7474".to_string());
        assert!(matches!(
            BigQueryToNeo4jJob::new(&params).validate(),
            Err(EtlError::InvalidConfigValueError { .. })
        ));
    }
}
