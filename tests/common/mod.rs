#![allow(dead_code)]

use async_trait::async_trait;
use metadata_ingest::adapters::neo4j::{CypherRunner, Statement};
use metadata_ingest::{EtlError, Result};
use serde_json::{Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// In-memory graph: records every statement and answers queries with canned rows.
#[derive(Default)]
pub struct RecordingGraph {
    rows: Vec<Map<String, Value>>,
    unavailable: bool,
    statements: Mutex<Vec<Statement>>,
}

impl RecordingGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_rows(rows: Value) -> Arc<Self> {
        let rows = match rows {
            Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Arc::new(Self {
            rows,
            ..Default::default()
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            unavailable: true,
            ..Default::default()
        })
    }

    pub fn statements(&self) -> Vec<Statement> {
        self.statements.lock().unwrap().clone()
    }

    fn record(&self, statement: Statement) -> Result<()> {
        self.statements.lock().unwrap().push(statement);
        if self.unavailable {
            return Err(EtlError::processing("neo4j unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl CypherRunner for RecordingGraph {
    async fn run(&self, statement: Statement) -> Result<()> {
        self.record(statement)
    }

    async fn query(&self, statement: Statement) -> Result<Vec<Map<String, Value>>> {
        self.record(statement)?;
        Ok(self.rows.clone())
    }
}

/// Plain TCP listener standing in for a Bolt endpoint, to tell whether anything dialled it.
pub struct BoltListener {
    listener: TcpListener,
}

impl BoltListener {
    pub async fn bind() -> Self {
        Self {
            listener: TcpListener::bind("127.0.0.1:0").await.unwrap(),
        }
    }

    pub fn uri(&self) -> String {
        format!("bolt://{}", self.listener.local_addr().unwrap())
    }

    pub async fn was_dialled(&self) -> bool {
        tokio::time::timeout(Duration::from_millis(200), self.listener.accept())
            .await
            .is_ok()
    }
}
