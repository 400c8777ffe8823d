use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use neo4rs::{BoltList, BoltMap, BoltNull, BoltType, ConfigBuilder, Graph, Query};
use serde_json::{Map, Value};

pub const DEFAULT_DATABASE: &str = "neo4j";

/// 連線 Neo4j (Bolt) 所需的資訊
#[derive(Debug, Clone, PartialEq)]
pub struct Neo4jConnection {
    pub endpoint: String,
    pub user: String,
    pub password: String,
    pub database: String,
    pub validate_ssl: bool,
}

impl Neo4jConnection {
    /// Endpoint as handed to the driver. With certificate validation off, TLS schemes
    /// (`bolt+s`, `neo4j+s`) become their self-signed variants (`+ssc`).
    pub fn bolt_uri(&self) -> String {
        let endpoint = self.endpoint.trim();
        if self.validate_ssl {
            return endpoint.to_string();
        }
        match endpoint.split_once("+s://") {
            Some((scheme, rest)) => format!("{}+ssc://{}", scheme, rest),
            None => endpoint.to_string(),
        }
    }
}

/// Cypher text plus its JSON parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub parameters: Map<String, Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Map::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.to_string(), value.into());
        self
    }
}

/// Anything that can run Cypher: the Bolt driver in production, recorders in tests.
#[async_trait]
pub trait CypherRunner: Send + Sync {
    /// Runs a statement in its own auto-committed transaction, discarding rows.
    async fn run(&self, statement: Statement) -> Result<()>;

    /// Runs a statement and returns every row keyed by column name.
    async fn query(&self, statement: Statement) -> Result<Vec<Map<String, Value>>>;
}

fn bolt_value(value: Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => b.into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap_or_default().into(),
        },
        Value::String(s) => s.into(),
        Value::Array(items) => BoltType::List(BoltList::from(
            items.into_iter().map(bolt_value).collect::<Vec<_>>(),
        )),
        Value::Object(map) => {
            let mut bolt = BoltMap::new();
            for (key, value) in map {
                bolt.put(key.into(), bolt_value(value));
            }
            BoltType::Map(bolt)
        }
    }
}

fn to_query(statement: Statement) -> Query {
    statement
        .parameters
        .into_iter()
        .fold(Query::new(statement.text), |query, (key, value)| {
            query.param(&key, bolt_value(value))
        })
}

/// Bolt client backed by a `neo4rs` connection pool.
pub struct Neo4jClient {
    graph: Graph,
}

impl Neo4jClient {
    /// Builds the pool; connections are opened on first use.
    pub fn connect(connection: &Neo4jConnection) -> Result<Self> {
        let config = ConfigBuilder::default()
            .uri(connection.bolt_uri())
            .user(connection.user.as_str())
            .password(connection.password.as_str())
            .db(connection.database.as_str())
            .build()?;
        let graph = Graph::connect(config)?;

        tracing::debug!(
            "Neo4j pool ready for {} (database {})",
            connection.endpoint,
            connection.database
        );
        Ok(Self { graph })
    }
}

#[async_trait]
impl CypherRunner for Neo4jClient {
    async fn run(&self, statement: Statement) -> Result<()> {
        self.graph.run(to_query(statement)).await?;
        Ok(())
    }

    async fn query(&self, statement: Statement) -> Result<Vec<Map<String, Value>>> {
        let mut stream = self.graph.execute(to_query(statement)).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            let row: Map<String, Value> = row
                .to()
                .map_err(|e| EtlError::processing(format!("Cannot decode Neo4j row: {}", e)))?;
            rows.push(row);
        }
        Ok(rows)
    }
}
