mod common;

use common::RecordingGraph;
use httpmock::prelude::*;
use metadata_ingest::config::{IngestConfig, JobParams};
use metadata_ingest::{BigQueryToNeo4jJob, EtlError, Launch};
use serde_json::json;
use tempfile::TempDir;

const BOLT_ENDPOINT: &str = "bolt://graph.internal:7687";

fn params(bigquery: &MockServer, neo4j_endpoint: Option<&str>, staging: &TempDir) -> JobParams {
    let mut params = IngestConfig::default().into_params().unwrap();
    params.project_id = "analytics-prod".to_string();
    params.bigquery_api_base = bigquery.base_url();
    params.neo4j_endpoint = neo4j_endpoint.map(str::to_string);
    params.neo4j_user = Some("neo4j".to_string());
    params.neo4j_password = Some("secret".to_string());
    params.publish_tag = "2024-05-01".to_string();
    params.staging_root = staging.path().to_path_buf();
    params
}

async fn mock_bigquery(server: &MockServer) {
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/projects/analytics-prod/datasets")
                .query_param("filter", "labels.type:csv");
            then.status(200).json_body(json!({
                "datasets": [{"datasetReference": {"datasetId": "sales"}}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/projects/analytics-prod/datasets/sales/tables");
            then.status(200).json_body(json!({
                "tables": [{"tableReference": {"tableId": "orders"}}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/projects/analytics-prod/datasets/sales/tables/orders");
            then.status(200).json_body(json!({
                "type": "TABLE",
                "description": "Customer orders",
                "schema": {"fields": [
                    {"name": "id", "type": "INTEGER", "mode": "REQUIRED"},
                    {"name": "amount", "type": "NUMERIC"}
                ]}
            }));
        })
        .await;
}

#[tokio::test]
async fn test_job_publishes_table_graph_and_cleans_staging() -> anyhow::Result<()> {
    let staging = TempDir::new()?;
    let bigquery = MockServer::start_async().await;
    mock_bigquery(&bigquery).await;

    let graph = RecordingGraph::new();
    let job = BigQueryToNeo4jJob::new(&params(&bigquery, Some(BOLT_ENDPOINT), &staging))
        .with_graph(graph.clone());
    let report = job.launch().await?;

    assert_eq!(report.task.extracted, 1);
    // Database, Cluster, Schema, Table, Description and two Columns
    assert_eq!(report.published.nodes, 7);
    assert_eq!(report.published.relationships, 6);

    let statements = graph.statements();
    assert!(statements
        .iter()
        .any(|s| s.text.starts_with("CREATE CONSTRAINT IF NOT EXISTS FOR (n:Table)")));
    let table_merge = statements
        .iter()
        .find(|s| s.text.contains("MERGE (n:Table {key: row.key})"))
        .expect("table merge statement");
    assert_eq!(table_merge.parameters["publish_tag"], json!("2024-05-01"));
    assert_eq!(
        table_merge.parameters["rows"][0]["key"],
        json!("bigquery://analytics-prod.sales/orders")
    );

    let base = staging.path().join("bigquery_metadata");
    assert!(!base.join("nodes").exists());
    assert!(!base.join("relationships").exists());
    Ok(())
}

#[tokio::test]
async fn test_failed_publish_keeps_staged_csv() -> anyhow::Result<()> {
    let staging = TempDir::new()?;
    let bigquery = MockServer::start_async().await;
    mock_bigquery(&bigquery).await;

    let job = BigQueryToNeo4jJob::new(&params(&bigquery, Some(BOLT_ENDPOINT), &staging))
        .with_graph(RecordingGraph::unavailable());
    let err = job.launch().await.unwrap_err();

    assert!(matches!(err, EtlError::ProcessingError { .. }));
    assert!(staging
        .path()
        .join("bigquery_metadata/nodes/Table.csv")
        .exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_endpoint_fails_before_any_request() -> anyhow::Result<()> {
    let staging = TempDir::new()?;
    let bigquery = MockServer::start_async().await;
    let any = bigquery
        .mock_async(|when, then| {
            when.any_request();
            then.status(200).json_body(json!({}));
        })
        .await;

    let job = BigQueryToNeo4jJob::new(&params(&bigquery, None, &staging));
    let err = job.launch().await.unwrap_err();

    assert!(matches!(err, EtlError::MissingConfigError { .. }));
    any.assert_hits_async(0).await;
    assert!(!staging.path().join("bigquery_metadata").exists());
    Ok(())
}
