//! Index settings and mappings for the dashboard search index.

use serde_json::{json, Value};

pub const DASHBOARD_INDEX_ALIAS: &str = "dashboard_search_index";
pub const DASHBOARD_DOC_TYPE: &str = "dashboard";

/// Settings and mappings used when creating a new dashboard index.
///
/// - `stemming_analyzer`: english stemming for free-text descriptions
/// - `lowercase_normalizer`: case-insensitive exact matches on `.raw` sub-fields
pub fn dashboard_index_mapping() -> Value {
    let name_field = json!({
        "type": "text",
        "analyzer": "simple",
        "fields": {
            "raw": {
                "type": "keyword",
                "normalizer": "lowercase_normalizer"
            }
        }
    });

    json!({
        "settings": {
            "analysis": {
                "normalizer": {
                    "lowercase_normalizer": {
                        "type": "custom",
                        "char_filter": [],
                        "filter": ["lowercase", "asciifolding"]
                    }
                },
                "analyzer": {
                    "stemming_analyzer": {
                        "type": "custom",
                        "tokenizer": "standard",
                        "filter": ["lowercase", "asciifolding", "english_stemmer"]
                    }
                },
                "filter": {
                    "english_stemmer": {
                        "type": "stemmer",
                        "language": "english"
                    }
                }
            }
        },
        "mappings": {
            "properties": {
                "group_name": name_field,
                "name": name_field,
                "description": {
                    "type": "text",
                    "analyzer": "stemming_analyzer"
                },
                "group_description": {
                    "type": "text",
                    "analyzer": "stemming_analyzer"
                },
                "query_names": name_field,
                "chart_names": name_field,
                "product": { "type": "keyword" },
                "cluster": { "type": "keyword" },
                "url": { "type": "keyword", "index": false },
                "group_url": { "type": "keyword", "index": false },
                "uri": { "type": "keyword" },
                "last_successful_run_timestamp": {
                    "type": "date",
                    "format": "epoch_second"
                },
                "total_usage": { "type": "long" },
                "tags": { "type": "keyword" },
                "badges": { "type": "keyword" }
            }
        }
    })
}
