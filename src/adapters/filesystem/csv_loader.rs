use crate::config::job_config::{ConfigEntries, ConfigMap};
use crate::domain::graph::{GraphNode, GraphRelationship, GraphSerializable};
use crate::domain::model::Record;
use crate::domain::ports::Loader;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const SCOPE: &str = "loader.filesystem_csv_neo4j";

pub const NODE_KEY: &str = "KEY";
pub const NODE_LABEL: &str = "LABEL";
pub const RELATION_START_LABEL: &str = "START_LABEL";
pub const RELATION_END_LABEL: &str = "END_LABEL";
pub const RELATION_START_KEY: &str = "START_KEY";
pub const RELATION_END_KEY: &str = "END_KEY";
pub const RELATION_TYPE: &str = "TYPE";
pub const RELATION_REVERSE_TYPE: &str = "REVERSE_TYPE";
/// Header suffix for attributes that must not be published as strings.
pub const UNQUOTED_SUFFIX: &str = ":UNQUOTED";

#[derive(Debug, Clone, PartialEq)]
pub struct FsNeo4jCsvLoaderConfig {
    pub node_dir: PathBuf,
    pub relationship_dir: PathBuf,
    pub delete_created_dirs: bool,
}

impl Validate for FsNeo4jCsvLoaderConfig {
    fn validate(&self) -> Result<()> {
        let node_dir = self.node_dir.to_string_lossy();
        let relationship_dir = self.relationship_dir.to_string_lossy();
        validation::validate_path(&format!("{SCOPE}.node_dir_path"), &node_dir)?;
        validation::validate_path(&format!("{SCOPE}.relationship_dir_path"), &relationship_dir)?;

        if self.node_dir == self.relationship_dir {
            return Err(EtlError::InvalidConfigValueError {
                field: format!("{SCOPE}.relationship_dir_path"),
                value: relationship_dir.to_string(),
                reason: "Node and relationship directories must differ".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigEntries for FsNeo4jCsvLoaderConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        map.insert_scoped(SCOPE, "node_dir_path", self.node_dir.to_string_lossy().into_owned())?;
        map.insert_scoped(
            SCOPE,
            "relationship_dir_path",
            self.relationship_dir.to_string_lossy().into_owned(),
        )?;
        map.insert_scoped(SCOPE, "delete_created_directories", self.delete_created_dirs)?;
        Ok(map)
    }
}

/// 將 graph 可序列化的記錄寫成 node / relationship CSV
pub struct FsNeo4jCsvLoader {
    config: FsNeo4jCsvLoaderConfig,
}

impl FsNeo4jCsvLoader {
    pub fn new(config: FsNeo4jCsvLoaderConfig) -> Self {
        Self { config }
    }

    fn recreate_dir(path: &Path) -> Result<()> {
        if path.exists() {
            tracing::debug!("Removing stale staging directory {}", path.display());
            fs::remove_dir_all(path)?;
        }
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn remove_dir(path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Attribute columns for a group of rows, with `:UNQUOTED` on non-string values.
fn attribute_headers<'a>(rows: impl Iterator<Item = &'a BTreeMap<String, Value>>) -> Vec<(String, String)> {
    let mut unquoted = BTreeSet::new();
    let mut names = BTreeSet::new();
    for attributes in rows {
        for (name, value) in attributes {
            names.insert(name.clone());
            if !value.is_string() && !value.is_null() {
                unquoted.insert(name.clone());
            }
        }
    }

    names
        .into_iter()
        .map(|name| {
            let header = if unquoted.contains(&name) {
                format!("{}{}", name, UNQUOTED_SUFFIX)
            } else {
                name.clone()
            };
            (name, header)
        })
        .collect()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn write_node_file(path: &Path, nodes: &[GraphNode]) -> Result<()> {
    let attributes = attribute_headers(nodes.iter().map(|n| &n.attributes));
    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec![NODE_KEY.to_string(), NODE_LABEL.to_string()];
    header.extend(attributes.iter().map(|(_, h)| h.clone()));
    writer.write_record(&header)?;

    for node in nodes {
        let mut row = vec![node.key.clone(), node.label.clone()];
        row.extend(attributes.iter().map(|(name, _)| cell(node.attributes.get(name))));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_relationship_file(path: &Path, relationships: &[GraphRelationship]) -> Result<()> {
    let attributes = attribute_headers(relationships.iter().map(|r| &r.attributes));
    let mut writer = csv::Writer::from_path(path)?;

    let mut header: Vec<String> = [
        RELATION_START_LABEL,
        RELATION_END_LABEL,
        RELATION_START_KEY,
        RELATION_END_KEY,
        RELATION_TYPE,
        RELATION_REVERSE_TYPE,
    ]
    .iter()
    .map(|h| h.to_string())
    .collect();
    header.extend(attributes.iter().map(|(_, h)| h.clone()));
    writer.write_record(&header)?;

    for rel in relationships {
        let mut row = vec![
            rel.start_label.clone(),
            rel.end_label.clone(),
            rel.start_key.clone(),
            rel.end_key.clone(),
            rel.relationship_type.clone(),
            rel.reverse_type.clone(),
        ];
        row.extend(attributes.iter().map(|(name, _)| cell(rel.attributes.get(name))));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[async_trait]
impl Loader for FsNeo4jCsvLoader {
    async fn load(&self, records: Vec<Record>) -> Result<usize> {
        Self::recreate_dir(&self.config.node_dir)?;
        Self::recreate_dir(&self.config.relationship_dir)?;

        let mut nodes: BTreeMap<String, Vec<GraphNode>> = BTreeMap::new();
        let mut relationships: BTreeMap<(String, String, String), Vec<GraphRelationship>> =
            BTreeMap::new();
        let mut seen_nodes = HashSet::new();
        let mut seen_relationships = HashSet::new();
        let count = records.len();

        for record in records {
            let table = match record {
                Record::Table(table) => table,
                other => {
                    return Err(EtlError::processing(format!(
                        "{} cannot stage {} records",
                        SCOPE,
                        other.kind()
                    )))
                }
            };

            for node in table.nodes() {
                if seen_nodes.insert((node.label.clone(), node.key.clone())) {
                    nodes.entry(node.label.clone()).or_default().push(node);
                }
            }
            for rel in table.relationships() {
                let identity = (
                    rel.start_key.clone(),
                    rel.end_key.clone(),
                    rel.relationship_type.clone(),
                );
                if seen_relationships.insert(identity) {
                    relationships
                        .entry((
                            rel.start_label.clone(),
                            rel.end_label.clone(),
                            rel.relationship_type.clone(),
                        ))
                        .or_default()
                        .push(rel);
                }
            }
        }

        for (label, group) in &nodes {
            let path = self.config.node_dir.join(format!("{}.csv", label));
            write_node_file(&path, group)?;
            tracing::debug!("Wrote {} {} node(s) to {}", group.len(), label, path.display());
        }
        for ((start, end, rel_type), group) in &relationships {
            let path = self
                .config
                .relationship_dir
                .join(format!("{}_{}_{}.csv", start, end, rel_type));
            write_relationship_file(&path, group)?;
            tracing::debug!("Wrote {} relationship(s) to {}", group.len(), path.display());
        }

        tracing::info!(
            "🗂️ Staged {} node(s) and {} relationship(s) from {} record(s)",
            seen_nodes.len(),
            seen_relationships.len(),
            count
        );
        Ok(count)
    }

    async fn on_publish_success(&self) -> Result<()> {
        if self.config.delete_created_dirs {
            tracing::debug!("Deleting staging directories");
            Self::remove_dir(&self.config.node_dir)?;
            Self::remove_dir(&self.config.relationship_dir)?;
        }
        Ok(())
    }

    fn scope(&self) -> &str {
        SCOPE
    }
}
