use crate::domain::model::TableMetadata;
use serde_json::Value;
use std::collections::BTreeMap;

pub const DATABASE_LABEL: &str = "Database";
pub const CLUSTER_LABEL: &str = "Cluster";
pub const SCHEMA_LABEL: &str = "Schema";
pub const TABLE_LABEL: &str = "Table";
pub const COLUMN_LABEL: &str = "Column";
pub const DESCRIPTION_LABEL: &str = "Description";

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub key: String,
    pub label: String,
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphRelationship {
    pub start_label: String,
    pub end_label: String,
    pub start_key: String,
    pub end_key: String,
    pub relationship_type: String,
    pub reverse_type: String,
    pub attributes: BTreeMap<String, Value>,
}

/// 可轉換為圖形節點與關係的記錄
pub trait GraphSerializable {
    fn nodes(&self) -> Vec<GraphNode>;
    fn relationships(&self) -> Vec<GraphRelationship>;
}

fn node(key: String, label: &str, attributes: Vec<(&str, Value)>) -> GraphNode {
    GraphNode {
        key,
        label: label.to_string(),
        attributes: attributes
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    }
}

fn relationship(
    start: (&str, &str),
    end: (&str, &str),
    relationship_type: &str,
    reverse_type: &str,
) -> GraphRelationship {
    GraphRelationship {
        start_label: start.0.to_string(),
        start_key: start.1.to_string(),
        end_label: end.0.to_string(),
        end_key: end.1.to_string(),
        relationship_type: relationship_type.to_string(),
        reverse_type: reverse_type.to_string(),
        attributes: BTreeMap::new(),
    }
}

impl TableMetadata {
    fn database_key(&self) -> String {
        format!("database://{}", self.database)
    }

    fn cluster_key(&self) -> String {
        format!("{}://{}", self.database, self.cluster)
    }

    fn schema_key(&self) -> String {
        format!("{}://{}.{}", self.database, self.cluster, self.schema)
    }

    fn description_key(owner_key: &str) -> String {
        format!("{}/_description", owner_key)
    }

    fn column_key(&self, column: &str) -> String {
        format!("{}/{}", self.key(), column)
    }
}

impl GraphSerializable for TableMetadata {
    fn nodes(&self) -> Vec<GraphNode> {
        let table_key = self.key();
        let mut nodes = vec![
            node(
                self.database_key(),
                DATABASE_LABEL,
                vec![("name", Value::from(self.database.as_str()))],
            ),
            node(
                self.cluster_key(),
                CLUSTER_LABEL,
                vec![("name", Value::from(self.cluster.as_str()))],
            ),
            node(
                self.schema_key(),
                SCHEMA_LABEL,
                vec![("name", Value::from(self.schema.as_str()))],
            ),
            node(
                table_key.clone(),
                TABLE_LABEL,
                vec![
                    ("name", Value::from(self.name.as_str())),
                    ("is_view", Value::from(self.is_view)),
                ],
            ),
        ];

        if let Some(description) = &self.description {
            nodes.push(node(
                Self::description_key(&table_key),
                DESCRIPTION_LABEL,
                vec![
                    ("description", Value::from(description.as_str())),
                    ("description_source", Value::from("description")),
                ],
            ));
        }

        for column in &self.columns {
            let column_key = self.column_key(&column.name);
            nodes.push(node(
                column_key.clone(),
                COLUMN_LABEL,
                vec![
                    ("name", Value::from(column.name.as_str())),
                    ("col_type", Value::from(column.col_type.as_str())),
                    ("sort_order", Value::from(column.sort_order)),
                ],
            ));
            if let Some(description) = &column.description {
                nodes.push(node(
                    Self::description_key(&column_key),
                    DESCRIPTION_LABEL,
                    vec![
                        ("description", Value::from(description.as_str())),
                        ("description_source", Value::from("description")),
                    ],
                ));
            }
        }

        nodes
    }

    fn relationships(&self) -> Vec<GraphRelationship> {
        let database_key = self.database_key();
        let cluster_key = self.cluster_key();
        let schema_key = self.schema_key();
        let table_key = self.key();

        let mut relationships = vec![
            relationship(
                (DATABASE_LABEL, &database_key),
                (CLUSTER_LABEL, &cluster_key),
                "CLUSTER",
                "CLUSTER_OF",
            ),
            relationship(
                (CLUSTER_LABEL, &cluster_key),
                (SCHEMA_LABEL, &schema_key),
                "SCHEMA",
                "SCHEMA_OF",
            ),
            relationship(
                (SCHEMA_LABEL, &schema_key),
                (TABLE_LABEL, &table_key),
                "TABLE",
                "TABLE_OF",
            ),
        ];

        if self.description.is_some() {
            relationships.push(relationship(
                (TABLE_LABEL, &table_key),
                (DESCRIPTION_LABEL, &Self::description_key(&table_key)),
                "DESCRIPTION",
                "DESCRIPTION_OF",
            ));
        }

        for column in &self.columns {
            let column_key = self.column_key(&column.name);
            relationships.push(relationship(
                (TABLE_LABEL, &table_key),
                (COLUMN_LABEL, &column_key),
                "COLUMN",
                "COLUMN_OF",
            ));
            if column.description.is_some() {
                relationships.push(relationship(
                    (COLUMN_LABEL, &column_key),
                    (DESCRIPTION_LABEL, &Self::description_key(&column_key)),
                    "DESCRIPTION",
                    "DESCRIPTION_OF",
                ));
            }
        }

        relationships
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ColumnMetadata;

    fn orders_table() -> TableMetadata {
        TableMetadata {
            database: "bigquery".to_string(),
            cluster: "acme".to_string(),
            schema: "sales".to_string(),
            name: "orders".to_string(),
            description: Some("All orders".to_string()),
            is_view: false,
            columns: vec![
                ColumnMetadata {
                    name: "id".to_string(),
                    col_type: "INT64".to_string(),
                    description: Some("Order id".to_string()),
                    sort_order: 0,
                },
                ColumnMetadata {
                    name: "amount".to_string(),
                    col_type: "NUMERIC".to_string(),
                    description: None,
                    sort_order: 1,
                },
            ],
        }
    }

    #[test]
    fn test_table_nodes() {
        let nodes = orders_table().nodes();
        let keys: Vec<&str> = nodes.iter().map(|n| n.key.as_str()).collect();

        assert_eq!(
            keys,
            vec![
                "database://bigquery",
                "bigquery://acme",
                "bigquery://acme.sales",
                "bigquery://acme.sales/orders",
                "bigquery://acme.sales/orders/_description",
                "bigquery://acme.sales/orders/id",
                "bigquery://acme.sales/orders/id/_description",
                "bigquery://acme.sales/orders/amount",
            ]
        );

        let column = nodes.iter().find(|n| n.key.ends_with("/amount")).unwrap();
        assert_eq!(column.label, COLUMN_LABEL);
        assert_eq!(column.attributes["sort_order"], Value::from(1));
    }

    #[test]
    fn test_table_relationships() {
        let relationships = orders_table().relationships();

        // cluster, schema, table, table description, 2 columns, 1 column description
        assert_eq!(relationships.len(), 7);
        assert!(relationships.iter().any(|r| r.relationship_type == "COLUMN"
            && r.reverse_type == "COLUMN_OF"
            && r.end_key == "bigquery://acme.sales/orders/amount"));
        assert_eq!(
            relationships
                .iter()
                .filter(|r| r.relationship_type == "DESCRIPTION")
                .count(),
            2
        );
    }
}
