use crate::adapters::elasticsearch::index_map::{
    dashboard_index_mapping, DASHBOARD_DOC_TYPE, DASHBOARD_INDEX_ALIAS,
};
use crate::adapters::elasticsearch::publisher::DEFAULT_BATCH_SIZE;
use crate::adapters::elasticsearch::{
    ElasticsearchClient, ElasticsearchPublisher, ElasticsearchPublisherConfig,
};
use crate::adapters::filesystem::{FileMode, FsElasticsearchJsonLoader, FsElasticsearchJsonLoaderConfig};
use crate::adapters::neo4j::search_extractor::{DASHBOARD_MODEL, DEFAULT_DASHBOARD_CYPHER_QUERY};
use crate::adapters::neo4j::{
    CypherRunner, Neo4jConnection, Neo4jSearchDataExtractor, Neo4jSearchDataExtractorConfig,
};
use crate::config::job_config::{ConfigEntries, ConfigMap};
use crate::config::JobParams;
use crate::core::{DefaultTask, Job, Publisher};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::Validate;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_STAGING_FILE: &str =
    "/var/tmp/amundsen_dashboard/elasticsearch_dashboard_upload/es_data.json";

/// `dashboard_search_index_<YYYY-MM-DD>_<32 hex>`; unique per call so the alias can be
/// swapped onto a freshly built index.
pub fn dashboard_index_name(date: &str) -> String {
    format!("{}_{}_{}", DASHBOARD_INDEX_ALIAS, date, Uuid::new_v4().simple())
}

#[derive(Debug, Clone)]
pub struct Neo4jToElasticsearchJobConfig {
    pub extractor: Neo4jSearchDataExtractorConfig,
    pub loader: FsElasticsearchJsonLoaderConfig,
    pub publisher: ElasticsearchPublisherConfig,
}

impl Validate for Neo4jToElasticsearchJobConfig {
    fn validate(&self) -> Result<()> {
        self.extractor.validate()?;
        self.loader.validate()?;
        self.publisher.validate()?;

        if self.loader.file_path != self.publisher.file_path {
            return Err(EtlError::ConfigError {
                message: "loader and publisher staging files differ".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigEntries for Neo4jToElasticsearchJobConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = self.extractor.entries()?;
        map.merge(self.loader.entries()?)?;
        map.merge(self.publisher.entries()?)?;
        Ok(map)
    }
}

/// Neo4j dashboards → staging JSON → new Elasticsearch index + alias swap
#[derive(Clone)]
pub struct Neo4jToElasticsearchJob {
    connection: Neo4jConnection,
    publish_tag: String,
    search_client: Option<ElasticsearchClient>,
    file_path: PathBuf,
    graph: Option<Arc<dyn CypherRunner>>,
}

impl Neo4jToElasticsearchJob {
    pub fn new(params: &JobParams) -> Self {
        Self {
            connection: super::neo4j_connection(params),
            publish_tag: params.publish_tag.clone(),
            search_client: params.search_client.clone(),
            file_path: PathBuf::from(DEFAULT_STAGING_FILE),
            graph: None,
        }
    }

    /// Stages the search documents somewhere other than [`DEFAULT_STAGING_FILE`].
    pub fn with_staging_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = path.into();
        self
    }

    /// Reads dashboards through `graph` instead of a Bolt pool opened from the job parameters.
    pub fn with_graph(mut self, graph: Arc<dyn CypherRunner>) -> Self {
        self.graph = Some(graph);
        self
    }
}

impl Job for Neo4jToElasticsearchJob {
    const NAME: &'static str = "neo4j_to_elasticsearch";

    type Config = Neo4jToElasticsearchJobConfig;

    /// 每次呼叫都產生新的 index 名稱
    fn config(&self) -> Self::Config {
        let date = chrono::Local::now().format("%Y-%m-%d").to_string();

        Neo4jToElasticsearchJobConfig {
            extractor: Neo4jSearchDataExtractorConfig {
                connection: self.connection.clone(),
                cypher_query: DEFAULT_DASHBOARD_CYPHER_QUERY.to_string(),
                model: DASHBOARD_MODEL.to_string(),
                publish_tag: Some(self.publish_tag.clone()),
            },
            loader: FsElasticsearchJsonLoaderConfig {
                file_path: self.file_path.clone(),
                mode: FileMode::Write,
            },
            publisher: ElasticsearchPublisherConfig {
                file_path: self.file_path.clone(),
                mode: FileMode::Read,
                client: self.search_client.clone(),
                new_index: dashboard_index_name(&date),
                doc_type: DASHBOARD_DOC_TYPE.to_string(),
                mapping: dashboard_index_mapping(),
                alias: DASHBOARD_INDEX_ALIAS.to_string(),
                batch_size: DEFAULT_BATCH_SIZE,
            },
        }
    }

    fn task(&self, config: &Self::Config) -> Result<DefaultTask> {
        let extractor = Neo4jSearchDataExtractor::new(config.extractor.clone());
        let extractor = match &self.graph {
            Some(graph) => extractor.with_graph(graph.clone()),
            None => extractor,
        };
        Ok(DefaultTask::new(
            Box::new(extractor),
            Box::new(FsElasticsearchJsonLoader::new(config.loader.clone())),
        ))
    }

    fn publisher(&self, config: &Self::Config) -> Result<Box<dyn Publisher>> {
        Ok(Box::new(ElasticsearchPublisher::new(config.publisher.clone())))
    }
}
