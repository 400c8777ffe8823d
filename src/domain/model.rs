use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub name: String,
    pub col_type: String,
    pub description: Option<String>,
    pub sort_order: usize,
}

/// 資料倉儲中一張表的 metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub database: String,
    /// BigQuery project
    pub cluster: String,
    /// BigQuery dataset
    pub schema: String,
    pub name: String,
    pub description: Option<String>,
    pub is_view: bool,
    pub columns: Vec<ColumnMetadata>,
}

impl TableMetadata {
    pub fn key(&self) -> String {
        format!(
            "{}://{}.{}/{}",
            self.database, self.cluster, self.schema, self.name
        )
    }
}

/// Dashboard document as stored in the search index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSearchDocument {
    pub group_name: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub product: Option<String>,
    pub cluster: Option<String>,
    pub group_description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub query_names: Vec<String>,
    pub url: Option<String>,
    pub uri: Option<String>,
    pub last_successful_run_timestamp: Option<i64>,
    pub group_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub chart_names: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub total_usage: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub badges: Vec<String>,
}

// Cypher OPTIONAL MATCH yields null where serde's default only covers absent fields.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Table(TableMetadata),
    DashboardDocument(DashboardSearchDocument),
}

impl Record {
    pub fn kind(&self) -> &'static str {
        match self {
            Record::Table(_) => "table",
            Record::DashboardDocument(_) => "dashboard_document",
        }
    }
}
