use crate::config::job_config::{ConfigEntries, ConfigMap};
use crate::domain::model::Record;
use crate::domain::ports::Loader;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use async_trait::async_trait;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::str::FromStr;

pub const SCOPE: &str = "loader.filesystem.elasticsearch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Read,
    Write,
    Append,
}

impl FileMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Read => "r",
            FileMode::Write => "w",
            FileMode::Append => "a",
        }
    }
}

impl FromStr for FileMode {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "r" => Ok(FileMode::Read),
            "w" => Ok(FileMode::Write),
            "a" => Ok(FileMode::Append),
            other => Err(EtlError::InvalidConfigValueError {
                field: "mode".to_string(),
                value: other.to_string(),
                reason: "Expected one of r, w, a".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FsElasticsearchJsonLoaderConfig {
    pub file_path: PathBuf,
    pub mode: FileMode,
}

impl Validate for FsElasticsearchJsonLoaderConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path(&format!("{SCOPE}.file_path"), &self.file_path.to_string_lossy())?;
        if self.mode == FileMode::Read {
            return Err(EtlError::InvalidConfigValueError {
                field: format!("{SCOPE}.mode"),
                value: self.mode.as_str().to_string(),
                reason: "Loader must open the file for writing".to_string(),
            });
        }
        Ok(())
    }
}

impl ConfigEntries for FsElasticsearchJsonLoaderConfig {
    fn entries(&self) -> Result<ConfigMap> {
        let mut map = ConfigMap::new();
        map.insert_scoped(SCOPE, "file_path", self.file_path.to_string_lossy().into_owned())?;
        map.insert_scoped(SCOPE, "mode", self.mode.as_str())?;
        Ok(map)
    }
}

/// 以每行一個 JSON 文件的格式寫出搜尋文件
pub struct FsElasticsearchJsonLoader {
    config: FsElasticsearchJsonLoaderConfig,
}

impl FsElasticsearchJsonLoader {
    pub fn new(config: FsElasticsearchJsonLoaderConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Loader for FsElasticsearchJsonLoader {
    async fn load(&self, records: Vec<Record>) -> Result<usize> {
        if let Some(parent) = self.config.file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(self.config.mode == FileMode::Append)
            .truncate(self.config.mode == FileMode::Write)
            .open(&self.config.file_path)?;
        let mut writer = BufWriter::new(file);

        let mut count = 0;
        for record in records {
            match record {
                Record::DashboardDocument(document) => {
                    serde_json::to_writer(&mut writer, &document)?;
                    writer.write_all(b"\n")?;
                    count += 1;
                }
                other => {
                    return Err(EtlError::processing(format!(
                        "{} cannot stage {} records",
                        SCOPE,
                        other.kind()
                    )))
                }
            }
        }
        writer.flush()?;

        tracing::info!(
            "🗂️ Staged {} search document(s) in {}",
            count,
            self.config.file_path.display()
        );
        Ok(count)
    }

    fn scope(&self) -> &str {
        SCOPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DashboardSearchDocument;
    use tempfile::TempDir;

    fn document(name: &str) -> Record {
        Record::DashboardDocument(DashboardSearchDocument {
            name: Some(name.to_string()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_write_mode_truncates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("upload/es_data.json");
        let loader = FsElasticsearchJsonLoader::new(FsElasticsearchJsonLoaderConfig {
            file_path: path.clone(),
            mode: FileMode::Write,
        });

        loader.load(vec![document("a"), document("b")]).await.unwrap();
        loader.load(vec![document("c")]).await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 1);
        let doc: DashboardSearchDocument = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(doc.name.as_deref(), Some("c"));
    }

    #[tokio::test]
    async fn test_append_mode_keeps_previous_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("es_data.json");
        let loader = FsElasticsearchJsonLoader::new(FsElasticsearchJsonLoaderConfig {
            file_path: path.clone(),
            mode: FileMode::Append,
        });

        loader.load(vec![document("a")]).await.unwrap();
        loader.load(vec![document("b")]).await.unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }

    #[test]
    fn test_file_mode_parse() {
        assert_eq!("w".parse::<FileMode>().unwrap(), FileMode::Write);
        assert!("x".parse::<FileMode>().is_err());
    }
}
