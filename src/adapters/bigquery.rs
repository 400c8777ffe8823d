use crate::config::job_config::{ConfigEntries, ConfigMap, MASKED_VALUE};
use crate::config::REQUEST_TIMEOUT_SECONDS;
use crate::domain::model::{ColumnMetadata, Record, TableMetadata};
use crate::domain::ports::Extractor;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

pub const SCOPE: &str = "extractor.bigquery_table_metadata";
pub const DEFAULT_API_BASE_URL: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_PAGE_SIZE: usize = 1000;
const DATABASE_NAME: &str = "bigquery";

#[derive(Debug, Clone, PartialEq)]
pub struct BigQueryExtractorConfig {
    pub project_id: String,
    /// Dataset label filter, e.g. `labels.type:csv`.
    pub filter: Option<String>,
    pub page_size: usize,
    pub api_base_url: String,
    pub access_token: Option<String>,
}

impl Validate for BigQueryExtractorConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string(&format!("{SCOPE}.project_id_key"), &self.project_id)?;
        validation::validate_url(&format!("{SCOPE}.api_base_url"), &self.api_base_url)?;
        validation::validate_positive_number(&format!("{SCOPE}.page_size"), self.page_size, 1)?;
        Ok(())
    }
}

impl ConfigEntries for BigQueryExtractorConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        map.insert_scoped(SCOPE, "project_id_key", self.project_id.as_str())?;
        if let Some(filter) = &self.filter {
            map.insert_scoped(SCOPE, "filter_key", filter.as_str())?;
        }
        map.insert_scoped(SCOPE, "page_size", self.page_size)?;
        map.insert_scoped(SCOPE, "api_base_url", self.api_base_url.as_str())?;
        if self.access_token.is_some() {
            map.insert_scoped(SCOPE, "access_token", MASKED_VALUE)?;
        }
        Ok(map)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetList {
    #[serde(default)]
    datasets: Vec<DatasetEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetEntry {
    dataset_reference: DatasetReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetReference {
    dataset_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableList {
    #[serde(default)]
    tables: Vec<TableEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableEntry {
    table_reference: TableReference,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TableReference {
    table_id: String,
}

#[derive(Debug, Deserialize)]
struct TableResource {
    description: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    schema: Option<TableSchema>,
}

#[derive(Debug, Default, Deserialize)]
struct TableSchema {
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

#[derive(Debug, Deserialize)]
struct FieldSchema {
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    mode: Option<String>,
    description: Option<String>,
    #[serde(default)]
    fields: Vec<FieldSchema>,
}

/// 從 BigQuery REST API 讀取 dataset / table / schema metadata
pub struct BigQueryMetadataExtractor {
    config: BigQueryExtractorConfig,
    client: Client,
}

impl BigQueryMetadataExtractor {
    pub fn new(config: BigQueryExtractorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self { config, client })
    }

    fn project_url(&self) -> String {
        format!(
            "{}/projects/{}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.project_id
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::debug!("BigQuery request: {}", url);
        let mut request = self.client.get(url).query(query);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EtlError::RemoteServiceError {
                service: "bigquery".to_string(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    async fn list_datasets(&self) -> Result<Vec<String>> {
        let url = format!("{}/datasets", self.project_url());
        let mut datasets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", self.config.page_size.to_string())];
            if let Some(filter) = &self.config.filter {
                query.push(("filter", filter.clone()));
            }
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: DatasetList = self.get_json(&url, &query).await?;
            datasets.extend(
                page.datasets
                    .into_iter()
                    .map(|d| d.dataset_reference.dataset_id),
            );

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(datasets)
    }

    async fn list_tables(&self, dataset: &str) -> Result<Vec<String>> {
        let url = format!("{}/datasets/{}/tables", self.project_url(), dataset);
        let mut tables = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("maxResults", self.config.page_size.to_string())];
            if let Some(token) = page_token.take() {
                query.push(("pageToken", token));
            }

            let page: TableList = self.get_json(&url, &query).await?;
            tables.extend(page.tables.into_iter().map(|t| t.table_reference.table_id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(tables)
    }

    async fn table_metadata(&self, dataset: &str, table_id: &str, name: &str) -> Result<TableMetadata> {
        let url = format!(
            "{}/datasets/{}/tables/{}",
            self.project_url(),
            dataset,
            table_id
        );
        let resource: TableResource = self.get_json(&url, &[]).await?;

        let mut columns = Vec::new();
        flatten_fields(
            &resource.schema.unwrap_or_default().fields,
            None,
            &mut columns,
        );

        Ok(TableMetadata {
            database: DATABASE_NAME.to_string(),
            cluster: self.config.project_id.clone(),
            schema: dataset.to_string(),
            name: name.to_string(),
            description: resource.description.filter(|d| !d.trim().is_empty()),
            is_view: matches!(
                resource.kind.as_deref(),
                Some("VIEW") | Some("MATERIALIZED_VIEW")
            ),
            columns,
        })
    }
}

/// RECORD 欄位展開為 `parent.child`，排序依欄位出現順序
fn flatten_fields(fields: &[FieldSchema], parent: Option<&str>, columns: &mut Vec<ColumnMetadata>) {
    for field in fields {
        let name = match parent {
            Some(p) => format!("{}.{}", p, field.name),
            None => field.name.clone(),
        };
        let col_type = if field.mode.as_deref() == Some("REPEATED") {
            format!("ARRAY<{}>", field.field_type)
        } else {
            field.field_type.clone()
        };

        columns.push(ColumnMetadata {
            name: name.clone(),
            col_type,
            description: field.description.clone().filter(|d| !d.trim().is_empty()),
            sort_order: columns.len(),
        });

        if !field.fields.is_empty() {
            flatten_fields(&field.fields, Some(&name), columns);
        }
    }
}

fn shard_pattern() -> &'static Regex {
    static SHARD: OnceLock<Regex> = OnceLock::new();
    SHARD.get_or_init(|| Regex::new(r"^(.+?)_?(\d{8})$").expect("shard pattern is valid"))
}

/// Collapses date-sharded tables (`events_20240101`, `events_20240102`, ...) into one
/// entry named after the prefix, backed by the latest shard. Returns
/// `(table_id_to_read, table_name)` pairs in first-seen order.
pub fn collapse_sharded_tables(table_ids: Vec<String>) -> Vec<(String, String)> {
    let mut collapsed: Vec<(String, String)> = Vec::new();
    let mut by_prefix: HashMap<String, usize> = HashMap::new();

    for table_id in table_ids {
        let prefix = shard_pattern()
            .captures(&table_id)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        match prefix {
            Some(prefix) => match by_prefix.get(&prefix) {
                Some(&index) => {
                    if table_id > collapsed[index].0 {
                        collapsed[index].0 = table_id;
                    }
                }
                None => {
                    by_prefix.insert(prefix.clone(), collapsed.len());
                    collapsed.push((table_id, prefix));
                }
            },
            None => collapsed.push((table_id.clone(), table_id)),
        }
    }

    collapsed
}

#[async_trait]
impl Extractor for BigQueryMetadataExtractor {
    async fn extract(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();

        let datasets = self.list_datasets().await?;
        tracing::info!(
            "📂 Found {} dataset(s) in project {}",
            datasets.len(),
            self.config.project_id
        );

        for dataset in datasets {
            let tables = collapse_sharded_tables(self.list_tables(&dataset).await?);
            tracing::debug!("Dataset {} has {} table(s)", dataset, tables.len());

            for (table_id, name) in tables {
                let table = self.table_metadata(&dataset, &table_id, &name).await?;
                records.push(Record::Table(table));
            }
        }

        Ok(records)
    }

    fn scope(&self) -> &str {
        SCOPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn local_config(api_base_url: String) -> BigQueryExtractorConfig {
        BigQueryExtractorConfig {
            project_id: "acme".to_string(),
            filter: Some("labels.type:csv".to_string()),
            page_size: 1,
            api_base_url,
            access_token: None,
        }
    }

    #[test]
    fn test_collapse_sharded_tables() {
        let collapsed = collapse_sharded_tables(vec![
            "events_20240101".to_string(),
            "users".to_string(),
            "events_20240103".to_string(),
            "events_20240102".to_string(),
        ]);

        assert_eq!(
            collapsed,
            vec![
                ("events_20240103".to_string(), "events".to_string()),
                ("users".to_string(), "users".to_string()),
            ]
        );
    }

    #[test]
    fn test_flatten_nested_fields() {
        let fields: Vec<FieldSchema> = serde_json::from_value(json!([
            {"name": "id", "type": "INTEGER", "mode": "REQUIRED"},
            {"name": "address", "type": "RECORD", "fields": [
                {"name": "city", "type": "STRING", "description": "City name"},
                {"name": "zip", "type": "STRING"}
            ]},
            {"name": "tags", "type": "STRING", "mode": "REPEATED"}
        ]))
        .unwrap();

        let mut columns = Vec::new();
        flatten_fields(&fields, None, &mut columns);

        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "address", "address.city", "address.zip", "tags"]);
        assert_eq!(columns[2].sort_order, 2);
        assert_eq!(columns[2].description.as_deref(), Some("City name"));
        assert_eq!(columns[4].col_type, "ARRAY<STRING>");
    }

    #[test]
    fn test_config_validation() {
        let config = BigQueryExtractorConfig {
            project_id: "".to_string(),
            filter: None,
            page_size: DEFAULT_PAGE_SIZE,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_entries_mask_token() {
        let config = BigQueryExtractorConfig {
            project_id: "acme".to_string(),
            filter: Some("labels.type:csv".to_string()),
            page_size: DEFAULT_PAGE_SIZE,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: Some("ya29.token".to_string()),
        };
        let entries = config.entries().unwrap();
        assert_eq!(
            entries.get_str("extractor.bigquery_table_metadata.filter_key"),
            Some("labels.type:csv")
        );
        assert_eq!(
            entries.get_str("extractor.bigquery_table_metadata.access_token"),
            Some(MASKED_VALUE)
        );
    }

    #[tokio::test]
    async fn test_extract_follows_page_tokens() {
        let server = MockServer::start_async().await;
        // Follow-up page mocks are registered first so they win over the first-page ones.

        let datasets_second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/projects/acme/datasets")
                    .query_param("pageToken", "ds-2");
                then.status(200).json_body(json!({
                    "datasets": [{"datasetReference": {"datasetId": "finance"}}]
                }));
            })
            .await;
        let datasets_first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/projects/acme/datasets")
                    .query_param("filter", "labels.type:csv");
                then.status(200).json_body(json!({
                    "datasets": [{"datasetReference": {"datasetId": "sales"}}],
                    "nextPageToken": "ds-2"
                }));
            })
            .await;

        let sales_second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/projects/acme/datasets/sales/tables")
                    .query_param("pageToken", "tb-2");
                then.status(200).json_body(json!({
                    "tables": [{"tableReference": {"tableId": "refunds"}}]
                }));
            })
            .await;
        let sales_first = server
            .mock_async(|when, then| {
                when.method(GET).path("/projects/acme/datasets/sales/tables");
                then.status(200).json_body(json!({
                    "tables": [{"tableReference": {"tableId": "orders"}}],
                    "nextPageToken": "tb-2"
                }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/projects/acme/datasets/finance/tables");
                then.status(200).json_body(json!({
                    "tables": [{"tableReference": {"tableId": "ledger"}}]
                }));
            })
            .await;

        for (dataset, table) in [("sales", "orders"), ("sales", "refunds"), ("finance", "ledger")] {
            server
                .mock_async(|when, then| {
                    when.method(GET)
                        .path(format!("/projects/acme/datasets/{dataset}/tables/{table}"));
                    then.status(200).json_body(json!({
                        "type": "TABLE",
                        "schema": {"fields": [{"name": "id", "type": "INTEGER"}]}
                    }));
                })
                .await;
        }

        let extractor = BigQueryMetadataExtractor::new(local_config(server.base_url())).unwrap();
        let records = extractor.extract().await.unwrap();

        datasets_first.assert_async().await;
        datasets_second.assert_async().await;
        sales_first.assert_async().await;
        sales_second.assert_async().await;

        let tables: Vec<(String, String)> = records
            .iter()
            .map(|record| match record {
                Record::Table(table) => (table.schema.clone(), table.name.clone()),
                other => panic!("unexpected record: {other:?}"),
            })
            .collect();
        assert_eq!(
            tables,
            vec![
                ("sales".to_string(), "orders".to_string()),
                ("sales".to_string(), "refunds".to_string()),
                ("finance".to_string(), "ledger".to_string()),
            ]
        );
    }
}
