//! Jobs layer: wires concrete stages into the two ingestion jobs.

pub mod bigquery_to_neo4j;
pub mod neo4j_to_elasticsearch;

pub use bigquery_to_neo4j::{BigQueryToNeo4jJob, BigQueryToNeo4jJobConfig};
pub use neo4j_to_elasticsearch::{Neo4jToElasticsearchJob, Neo4jToElasticsearchJobConfig};

use crate::adapters::neo4j::Neo4jConnection;
use crate::config::JobParams;

/// Neo4j connection shared by both jobs. Missing credentials stay empty here and are
/// reported by stage validation.
fn neo4j_connection(params: &JobParams) -> Neo4jConnection {
    Neo4jConnection {
        endpoint: params.neo4j_endpoint.clone().unwrap_or_default(),
        user: params.neo4j_user.clone().unwrap_or_default(),
        password: params.neo4j_password.clone().unwrap_or_default(),
        database: params.neo4j_database.clone(),
        validate_ssl: false,
    }
}
