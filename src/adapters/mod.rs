//! Adapters layer: concrete stage implementations for the external systems (BigQuery, Neo4j,
//! Elasticsearch, local staging files).

pub mod bigquery;
pub mod elasticsearch;
pub mod filesystem;
pub mod neo4j;
