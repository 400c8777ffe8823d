use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const MASKED_VALUE: &str = "******";

/// Flat view of a job configuration keyed by dotted, stage-scoped names
/// such as `publisher.neo4j.job_publish_tag`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigMap {
    entries: BTreeMap<String, Value>,
}

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入一個鍵值；同一個 job 內鍵必須唯一
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(EtlError::ConfigError {
                message: format!("duplicate configuration key: {}", key),
            });
        }
        self.entries.insert(key, value.into());
        Ok(())
    }

    pub fn insert_scoped(
        &mut self,
        scope: &str,
        option: &str,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.insert(format!("{}.{}", scope, option), value)
    }

    pub fn merge(&mut self, other: ConfigMap) -> Result<()> {
        for (key, value) in other.entries {
            self.insert(key, value)?;
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys whose value is null, an empty string or an empty collection.
    pub fn empty_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, v)| match v {
                Value::Null => true,
                Value::String(s) => s.trim().is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
                _ => false,
            })
            .map(|(k, _)| k.as_str())
            .collect()
    }
}

impl fmt::Display for ConfigMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            match value {
                Value::String(s) => writeln!(f, "{} = {}", key, s)?,
                Value::Object(_) => writeln!(f, "{} = <{} bytes json>", key, value.to_string().len())?,
                other => writeln!(f, "{} = {}", key, other)?,
            }
        }
        Ok(())
    }
}

/// Renders a typed stage (or job) configuration as dotted entries.
pub trait ConfigEntries {
    fn entries(&self) -> Result<ConfigMap>;
}
