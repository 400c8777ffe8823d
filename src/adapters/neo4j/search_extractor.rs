use super::client::{CypherRunner, Neo4jClient, Neo4jConnection, Statement};
use crate::config::job_config::{ConfigEntries, ConfigMap, MASKED_VALUE};
use crate::domain::model::{DashboardSearchDocument, Record};
use crate::domain::ports::Extractor;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub const SCOPE: &str = "extractor.search_data";
pub const NEO4J_SCOPE: &str = "extractor.search_data.extractor.neo4j";
pub const PUBLISH_TAG_PLACEHOLDER: &str = "{publish_tag_filter}";

/// Query returning one row per dashboard, shaped like [`DashboardSearchDocument`].
pub const DEFAULT_DASHBOARD_CYPHER_QUERY: &str = r#"MATCH (dashboard:Dashboard)
{publish_tag_filter}
MATCH (dashboard)-[:DASHBOARD_OF]->(dbg:Dashboardgroup)
MATCH (dbg)-[:DASHBOARD_GROUP_OF]->(cluster:Cluster)
OPTIONAL MATCH (dashboard)-[:DESCRIPTION]->(db_descr:Description)
OPTIONAL MATCH (dbg)-[:DESCRIPTION]->(dbg_descr:Description)
OPTIONAL MATCH (dashboard)-[:EXECUTED]->(last_exec:Execution)
WHERE split(last_exec.key, '/')[5] = '_last_successful_execution'
OPTIONAL MATCH (dashboard)-[read:READ_BY]->(user:User)
WITH dashboard, dbg, db_descr, dbg_descr, cluster, last_exec, SUM(read.read_count) AS total_usage
OPTIONAL MATCH (dashboard)-[:HAS_QUERY]->(query:Query)-[:HAS_CHART]->(chart:Chart)
WITH dashboard, dbg, db_descr, dbg_descr, cluster, last_exec, total_usage,
     COLLECT(DISTINCT query.name) AS query_names, COLLECT(DISTINCT chart.name) AS chart_names
OPTIONAL MATCH (dashboard)-[:TAGGED_BY]->(tag:Tag)
WITH dashboard, dbg, db_descr, dbg_descr, cluster, last_exec, total_usage, query_names, chart_names,
     COLLECT(DISTINCT tag.key) AS tags
OPTIONAL MATCH (dashboard)-[:HAS_BADGE]->(badge:Badge)
RETURN dbg.name AS group_name,
       dashboard.name AS name,
       cluster.name AS cluster,
       coalesce(db_descr.description, '') AS description,
       coalesce(dbg_descr.description, '') AS group_description,
       dbg.dashboard_group_url AS group_url,
       dashboard.dashboard_url AS url,
       dashboard.key AS uri,
       split(dashboard.key, '_')[0] AS product,
       toInteger(last_exec.timestamp) AS last_successful_run_timestamp,
       query_names,
       chart_names,
       total_usage,
       tags,
       COLLECT(DISTINCT badge.key) AS badges
ORDER BY dbg.name"#;

pub const DASHBOARD_MODEL: &str = "dashboard_search_document";

#[derive(Debug, Clone, PartialEq)]
pub struct Neo4jSearchDataExtractorConfig {
    pub connection: Neo4jConnection,
    pub cypher_query: String,
    pub model: String,
    pub publish_tag: Option<String>,
}

impl Neo4jSearchDataExtractorConfig {
    /// Final query text with the publish tag filter spliced in.
    pub fn rendered_query(&self) -> String {
        let filter = match &self.publish_tag {
            Some(_) => "WHERE dashboard.published_tag = $publish_tag",
            None => "",
        };
        self.cypher_query.replace(PUBLISH_TAG_PLACEHOLDER, filter)
    }
}

impl Validate for Neo4jSearchDataExtractorConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_present(&format!("{NEO4J_SCOPE}.graph_url"), &self.connection.endpoint)?;
        validation::validate_bolt_uri(&format!("{NEO4J_SCOPE}.graph_url"), &self.connection.endpoint)?;
        validation::validate_present(&format!("{NEO4J_SCOPE}.neo4j_auth_user"), &self.connection.user)?;
        validation::validate_present(&format!("{NEO4J_SCOPE}.neo4j_auth_pw"), &self.connection.password)?;
        validation::validate_non_empty_string(&format!("{SCOPE}.cypher_query"), &self.cypher_query)?;
        if self.model != DASHBOARD_MODEL {
            return Err(EtlError::InvalidConfigValueError {
                field: format!("{NEO4J_SCOPE}.model_class"),
                value: self.model.clone(),
                reason: format!("Only {} is supported", DASHBOARD_MODEL),
            });
        }
        Ok(())
    }
}

impl ConfigEntries for Neo4jSearchDataExtractorConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        map.insert_scoped(NEO4J_SCOPE, "graph_url", self.connection.endpoint.as_str())?;
        map.insert_scoped(NEO4J_SCOPE, "model_class", self.model.as_str())?;
        map.insert_scoped(NEO4J_SCOPE, "neo4j_auth_user", self.connection.user.as_str())?;
        map.insert_scoped(NEO4J_SCOPE, "neo4j_auth_pw", MASKED_VALUE)?;
        map.insert_scoped(NEO4J_SCOPE, "neo4j_encrypted", self.connection.validate_ssl)?;
        map.insert_scoped(SCOPE, "cypher_query", self.cypher_query.as_str())?;
        if let Some(tag) = &self.publish_tag {
            map.insert_scoped(SCOPE, "job_publish_tag", tag.as_str())?;
        }
        Ok(map)
    }
}

/// 從 Neo4j 查詢 dashboard 並轉為搜尋文件
pub struct Neo4jSearchDataExtractor {
    config: Neo4jSearchDataExtractorConfig,
    graph: Option<Arc<dyn CypherRunner>>,
}

impl Neo4jSearchDataExtractor {
    pub fn new(config: Neo4jSearchDataExtractorConfig) -> Self {
        Self {
            config,
            graph: None,
        }
    }

    pub fn with_graph(mut self, graph: Arc<dyn CypherRunner>) -> Self {
        self.graph = Some(graph);
        self
    }

    fn statement(&self) -> Statement {
        let statement = Statement::new(self.config.rendered_query());
        match &self.config.publish_tag {
            Some(tag) => statement.param("publish_tag", tag.as_str()),
            None => statement,
        }
    }
}

#[async_trait]
impl Extractor for Neo4jSearchDataExtractor {
    async fn extract(&self) -> Result<Vec<Record>> {
        let graph: Arc<dyn CypherRunner> = match &self.graph {
            Some(graph) => graph.clone(),
            None => Arc::new(Neo4jClient::connect(&self.config.connection)?),
        };
        let rows = graph.query(self.statement()).await?;

        let records = rows
            .into_iter()
            .map(|row| -> Result<Record> {
                let document: DashboardSearchDocument = serde_json::from_value(Value::Object(row))?;
                Ok(Record::DashboardDocument(document))
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::info!("🔎 Extracted {} search document(s) from Neo4j", records.len());
        Ok(records)
    }

    fn scope(&self) -> &str {
        SCOPE
    }
}
