pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod jobs;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliArgs;

pub use crate::config::{IngestConfig, JobParams};
pub use crate::core::{Job, JobReport, JobSequence, Launch};
pub use crate::jobs::{BigQueryToNeo4jJob, Neo4jToElasticsearchJob};
pub use crate::utils::error::{EtlError, Result};

/// 預設流程：先 BigQuery → Neo4j，再 Neo4j → Elasticsearch
pub fn default_sequence(params: &JobParams) -> JobSequence {
    let mut sequence = JobSequence::new();
    sequence.add_job(Box::new(BigQueryToNeo4jJob::new(params)));
    sequence.add_job(Box::new(Neo4jToElasticsearchJob::new(params)));
    sequence
}
