use crate::config::REQUEST_TIMEOUT_SECONDS;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation;
use opensearch::http::request::JsonBody;
use opensearch::http::response::Response;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::indices::{IndicesCreateParts, IndicesGetAliasParts};
use opensearch::{BulkParts, OpenSearch};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PORT: u16 = 9200;

#[derive(Debug, Deserialize)]
struct BulkResponse {
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    #[serde(default)]
    status: u16,
    error: Option<Value>,
}

/// Handle to an Elasticsearch cluster. Cheap to clone; clones share the transport.
#[derive(Debug, Clone)]
pub struct ElasticsearchClient {
    client: OpenSearch,
    base_url: Url,
}

impl ElasticsearchClient {
    /// `host` may be a bare hostname (gets `http://` and `port`) or a full `http(s)://` URL,
    /// which is used as written.
    pub fn try_new(host: &str, port: u16) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(EtlError::missing("ELASTICSEARCH_HOST"));
        }

        let has_scheme = host.contains("://");
        let raw = if has_scheme {
            host.to_string()
        } else {
            format!("http://{}", host)
        };
        validation::validate_url("elasticsearch.host", &raw)?;

        let mut base_url = Url::parse(&raw).map_err(|e| EtlError::InvalidConfigValueError {
            field: "elasticsearch.host".to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })?;
        if !has_scheme && base_url.port().is_none() {
            base_url
                .set_port(Some(port))
                .map_err(|_| EtlError::InvalidConfigValueError {
                    field: "elasticsearch.port".to_string(),
                    value: port.to_string(),
                    reason: "Cannot set a port on this URL".to_string(),
                })?;
        }

        let transport = TransportBuilder::new(SingleNodeConnectionPool::new(base_url.clone()))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .disable_proxy()
            .build()
            .map_err(|e| EtlError::ConfigError {
                message: format!("Cannot build Elasticsearch transport: {}", e),
            })?;

        Ok(Self {
            client: OpenSearch::new(transport),
            base_url,
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status_code();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(EtlError::RemoteServiceError {
            service: "elasticsearch".to_string(),
            status: status.as_u16(),
            message,
        })
    }

    pub async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        tracing::debug!("Creating index {}", index);
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(body.clone())
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// 目前掛在 alias 上的 index；alias 不存在時回傳空陣列
    pub async fn indices_for_alias(&self, alias: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .indices()
            .get_alias(IndicesGetAliasParts::Name(&[alias]))
            .send()
            .await?;
        if response.status_code().as_u16() == 404 {
            return Ok(Vec::new());
        }

        let body: HashMap<String, Value> = Self::check(response).await?.json().await?;
        let mut indices: Vec<String> = body.into_keys().collect();
        indices.sort();
        Ok(indices)
    }

    /// Indexes `documents` into `index` in one bulk request and fails on the first
    /// rejected item.
    pub async fn bulk(&self, index: &str, documents: Vec<Value>) -> Result<usize> {
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);
        for document in documents {
            body.push(json!({ "index": { "_index": index } }).into());
            body.push(document.into());
        }

        let response = self.client.bulk(BulkParts::None).body(body).send().await?;
        let body: BulkResponse = Self::check(response).await?.json().await?;
        if body.errors {
            let failed = body
                .items
                .iter()
                .flat_map(|item| item.values())
                .find(|item| item.error.is_some());
            let (status, message) = match failed {
                Some(item) => (
                    item.status,
                    item.error.as_ref().map(Value::to_string).unwrap_or_default(),
                ),
                None => (200, "bulk request reported errors".to_string()),
            };
            return Err(EtlError::RemoteServiceError {
                service: "elasticsearch".to_string(),
                status,
                message,
            });
        }

        Ok(body.items.len())
    }

    pub async fn update_aliases(&self, actions: Vec<Value>) -> Result<()> {
        let response = self
            .client
            .indices()
            .update_aliases()
            .body(json!({ "actions": actions }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_bare_host_gets_scheme_and_port() {
        let client = ElasticsearchClient::try_new("search.internal", 9201).unwrap();
        assert_eq!(client.base_url(), "http://search.internal:9201");
    }

    #[test]
    fn test_explicit_port_wins() {
        let client = ElasticsearchClient::try_new("https://search.internal:443", 9200).unwrap();
        assert_eq!(client.base_url(), "https://search.internal");

        let client = ElasticsearchClient::try_new("http://search.internal:9300", 9200).unwrap();
        assert_eq!(client.base_url(), "http://search.internal:9300");
    }

    #[test]
    fn test_empty_host_is_missing() {
        assert!(matches!(
            ElasticsearchClient::try_new("  ", DEFAULT_PORT),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_alias_is_empty() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/_alias/dashboard_search_index");
                then.status(404).json_body(json!({"error": "alias missing", "status": 404}));
            })
            .await;

        let client = ElasticsearchClient::try_new(&server.base_url(), DEFAULT_PORT).unwrap();
        let indices = client.indices_for_alias("dashboard_search_index").await.unwrap();

        mock.assert_async().await;
        assert!(indices.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_sends_action_and_document_lines() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/_bulk")
                    .body_contains(r#"{"index":{"_index":"dashboard_search_index_x"}}"#)
                    .body_contains(r#"{"name":"Revenue"}"#);
                then.status(200).json_body(json!({
                    "errors": false,
                    "items": [{"index": {"status": 201}}]
                }));
            })
            .await;

        let client = ElasticsearchClient::try_new(&server.base_url(), DEFAULT_PORT).unwrap();
        let indexed = client
            .bulk("dashboard_search_index_x", vec![json!({"name": "Revenue"})])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(indexed, 1);
    }
}
