use super::client::{CypherRunner, Neo4jClient, Neo4jConnection, Statement};
use crate::adapters::filesystem::csv_loader::{
    NODE_KEY, NODE_LABEL, RELATION_END_KEY, RELATION_END_LABEL, RELATION_REVERSE_TYPE,
    RELATION_START_KEY, RELATION_START_LABEL, RELATION_TYPE, UNQUOTED_SUFFIX,
};
use crate::config::job_config::{ConfigEntries, ConfigMap, MASKED_VALUE};
use crate::domain::ports::{PublishSummary, Publisher};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const SCOPE: &str = "publisher.neo4j";
pub const DEFAULT_TRANSACTION_SIZE: usize = 500;

#[derive(Debug, Clone, PartialEq)]
pub struct Neo4jCsvPublisherConfig {
    pub node_files_dir: PathBuf,
    pub relation_files_dir: PathBuf,
    pub connection: Neo4jConnection,
    pub publish_tag: String,
    pub transaction_size: usize,
}

impl Validate for Neo4jCsvPublisherConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path(
            &format!("{SCOPE}.node_files_directory"),
            &self.node_files_dir.to_string_lossy(),
        )?;
        validation::validate_path(
            &format!("{SCOPE}.relation_files_directory"),
            &self.relation_files_dir.to_string_lossy(),
        )?;
        validation::validate_present(&format!("{SCOPE}.neo4j_endpoint"), &self.connection.endpoint)?;
        validation::validate_bolt_uri(&format!("{SCOPE}.neo4j_endpoint"), &self.connection.endpoint)?;
        validation::validate_present(&format!("{SCOPE}.neo4j_user"), &self.connection.user)?;
        validation::validate_present(&format!("{SCOPE}.neo4j_password"), &self.connection.password)?;
        validation::validate_non_empty_string(&format!("{SCOPE}.job_publish_tag"), &self.publish_tag)?;
        validation::validate_positive_number(
            &format!("{SCOPE}.neo4j_transaction_size"),
            self.transaction_size,
            1,
        )?;
        Ok(())
    }
}

impl ConfigEntries for Neo4jCsvPublisherConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        map.insert_scoped(
            SCOPE,
            "node_files_directory",
            self.node_files_dir.to_string_lossy().into_owned(),
        )?;
        map.insert_scoped(
            SCOPE,
            "relation_files_directory",
            self.relation_files_dir.to_string_lossy().into_owned(),
        )?;
        map.insert_scoped(SCOPE, "neo4j_endpoint", self.connection.endpoint.as_str())?;
        map.insert_scoped(SCOPE, "neo4j_database", self.connection.database.as_str())?;
        map.insert_scoped(SCOPE, "neo4j_user", self.connection.user.as_str())?;
        map.insert_scoped(SCOPE, "neo4j_password", MASKED_VALUE)?;
        map.insert_scoped(SCOPE, "neo4j_validate_ssl", self.connection.validate_ssl)?;
        map.insert_scoped(SCOPE, "job_publish_tag", self.publish_tag.as_str())?;
        map.insert_scoped(SCOPE, "neo4j_transaction_size", self.transaction_size)?;
        Ok(map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct RelationGroup {
    start_label: String,
    end_label: String,
    relationship_type: String,
    reverse_type: String,
}

fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("csv"))
        .collect();
    files.sort();
    Ok(files)
}

fn column(headers: &csv::StringRecord, name: &str, path: &Path) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        EtlError::processing(format!("{} is missing the {} column", path.display(), name))
    })
}

/// Non-reserved columns as `(index, property name, unquoted)`.
fn property_columns(headers: &csv::StringRecord, reserved: &[&str]) -> Vec<(usize, String, bool)> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !reserved.contains(h))
        .map(|(i, h)| match h.strip_suffix(UNQUOTED_SUFFIX) {
            Some(name) => (i, name.to_string(), true),
            None => (i, h.to_string(), false),
        })
        .collect()
}

fn row_properties(record: &csv::StringRecord, columns: &[(usize, String, bool)]) -> Map<String, Value> {
    let mut props = Map::new();
    for (index, name, unquoted) in columns {
        let raw = match record.get(*index) {
            Some(raw) if !raw.is_empty() => raw,
            _ => continue,
        };
        let value = if *unquoted {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::from(raw))
        } else {
            Value::from(raw)
        };
        props.insert(name.clone(), value);
    }
    props
}

fn field<'r>(record: &'r csv::StringRecord, index: usize) -> &'r str {
    record.get(index).unwrap_or_default()
}

fn read_node_files(dir: &Path) -> Result<BTreeMap<String, Vec<Value>>> {
    let mut by_label: BTreeMap<String, Vec<Value>> = BTreeMap::new();

    for path in csv_files(dir)? {
        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        let key_col = column(&headers, NODE_KEY, &path)?;
        let label_col = column(&headers, NODE_LABEL, &path)?;
        let props = property_columns(&headers, &[NODE_KEY, NODE_LABEL]);

        for record in reader.records() {
            let record = record?;
            let label = field(&record, label_col).to_string();
            validation::validate_cypher_identifier("node label", &label)?;
            by_label.entry(label).or_default().push(json!({
                "key": field(&record, key_col),
                "props": row_properties(&record, &props),
            }));
        }
    }

    Ok(by_label)
}

fn read_relation_files(dir: &Path) -> Result<BTreeMap<RelationGroup, Vec<Value>>> {
    const RESERVED: [&str; 6] = [
        RELATION_START_LABEL,
        RELATION_END_LABEL,
        RELATION_START_KEY,
        RELATION_END_KEY,
        RELATION_TYPE,
        RELATION_REVERSE_TYPE,
    ];
    let mut by_group: BTreeMap<RelationGroup, Vec<Value>> = BTreeMap::new();

    for path in csv_files(dir)? {
        let mut reader = csv::Reader::from_path(&path)?;
        let headers = reader.headers()?.clone();
        let start_label = column(&headers, RELATION_START_LABEL, &path)?;
        let end_label = column(&headers, RELATION_END_LABEL, &path)?;
        let start_key = column(&headers, RELATION_START_KEY, &path)?;
        let end_key = column(&headers, RELATION_END_KEY, &path)?;
        let rel_type = column(&headers, RELATION_TYPE, &path)?;
        let reverse_type = column(&headers, RELATION_REVERSE_TYPE, &path)?;
        let props = property_columns(&headers, &RESERVED);

        for record in reader.records() {
            let record = record?;
            let group = RelationGroup {
                start_label: field(&record, start_label).to_string(),
                end_label: field(&record, end_label).to_string(),
                relationship_type: field(&record, rel_type).to_string(),
                reverse_type: field(&record, reverse_type).to_string(),
            };
            validation::validate_cypher_identifier("start label", &group.start_label)?;
            validation::validate_cypher_identifier("end label", &group.end_label)?;
            validation::validate_cypher_identifier("relationship type", &group.relationship_type)?;
            validation::validate_cypher_identifier("reverse type", &group.reverse_type)?;

            by_group.entry(group).or_default().push(json!({
                "start_key": field(&record, start_key),
                "end_key": field(&record, end_key),
                "props": row_properties(&record, &props),
            }));
        }
    }

    Ok(by_group)
}

pub fn constraint_statement(label: &str) -> String {
    format!(
        "CREATE CONSTRAINT IF NOT EXISTS FOR (n:{}) REQUIRE n.key IS UNIQUE",
        label
    )
}

pub fn node_merge_statement(label: &str) -> String {
    format!(
        "UNWIND $rows AS row \
         MERGE (n:{} {{key: row.key}}) \
         SET n += row.props, n.published_tag = $publish_tag, \
         n.publisher_last_updated_epoch_ms = timestamp()",
        label
    )
}

fn relation_merge_statement(group: &RelationGroup) -> String {
    format!(
        "UNWIND $rows AS row \
         MATCH (n1:{start} {{key: row.start_key}}) \
         MATCH (n2:{end} {{key: row.end_key}}) \
         MERGE (n1)-[r1:{rel}]->(n2) \
         MERGE (n2)-[r2:{reverse}]->(n1) \
         SET r1 += row.props, r1.published_tag = $publish_tag, \
         r1.publisher_last_updated_epoch_ms = timestamp(), \
         r2 += row.props, r2.published_tag = $publish_tag, \
         r2.publisher_last_updated_epoch_ms = timestamp()",
        start = group.start_label,
        end = group.end_label,
        rel = group.relationship_type,
        reverse = group.reverse_type,
    )
}

/// 讀取 staging CSV，以 MERGE 寫入 Neo4j 並蓋上 publish tag
pub struct Neo4jCsvPublisher {
    config: Neo4jCsvPublisherConfig,
    graph: Option<Arc<dyn CypherRunner>>,
}

impl Neo4jCsvPublisher {
    pub fn new(config: Neo4jCsvPublisherConfig) -> Self {
        Self {
            config,
            graph: None,
        }
    }

    /// Publishes through `graph` instead of opening a Bolt pool from the connection settings.
    pub fn with_graph(mut self, graph: Arc<dyn CypherRunner>) -> Self {
        self.graph = Some(graph);
        self
    }

    fn graph(&self) -> Result<Arc<dyn CypherRunner>> {
        match &self.graph {
            Some(graph) => Ok(graph.clone()),
            None => Ok(Arc::new(Neo4jClient::connect(&self.config.connection)?)),
        }
    }

    async fn merge_in_batches(
        &self,
        graph: &dyn CypherRunner,
        statement: &str,
        rows: Vec<Value>,
    ) -> Result<()> {
        for chunk in rows.chunks(self.config.transaction_size) {
            graph
                .run(
                    Statement::new(statement)
                        .param("rows", chunk.to_vec())
                        .param("publish_tag", self.config.publish_tag.as_str()),
                )
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Publisher for Neo4jCsvPublisher {
    async fn publish(&self) -> Result<PublishSummary> {
        // Read everything first so a malformed file fails before anything is written.
        let nodes = read_node_files(&self.config.node_files_dir)?;
        let relations = read_relation_files(&self.config.relation_files_dir)?;
        let graph = self.graph()?;
        let mut summary = PublishSummary::default();

        for (label, rows) in nodes {
            tracing::debug!("Publishing {} {} node(s)", rows.len(), label);
            graph.run(Statement::new(constraint_statement(&label))).await?;
            summary.nodes += rows.len();
            self.merge_in_batches(graph.as_ref(), &node_merge_statement(&label), rows)
                .await?;
        }

        for (group, rows) in relations {
            tracing::debug!(
                "Publishing {} {} relationship(s) between {} and {}",
                rows.len(),
                group.relationship_type,
                group.start_label,
                group.end_label
            );
            summary.relationships += rows.len();
            self.merge_in_batches(graph.as_ref(), &relation_merge_statement(&group), rows)
                .await?;
        }

        tracing::info!(
            "🕸️ Published {} node(s) and {} relationship(s) with tag {}",
            summary.nodes,
            summary.relationships,
            self.config.publish_tag
        );
        Ok(summary)
    }

    fn scope(&self) -> &str {
        SCOPE
    }
}
