use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "metadata-ingest")]
#[command(about = "Publish BigQuery table metadata into Neo4j, then refresh the dashboard search index")]
#[command(after_help = "Environment: ELASTICSEARCH_HOST, ELASTICSEARCH_PORT, NEO4J_ENDPOINT, \
NEO4J_USERNAME, NEO4J_PASSWORD, NEO4J_DATABASE, BIGQUERY_PROJECT_ID, BIGQUERY_ACCESS_TOKEN, \
BIGQUERY_API_BASE, AMUNDSEN_STAGING_ROOT, RUST_LOG")]
pub struct CliArgs {
    /// TOML settings file; values override the environment, `${VAR}` is substituted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print each job's configuration (secrets masked) without running anything
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}
