use crate::domain::model::Record;
use crate::utils::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self) -> Result<Vec<Record>>;

    fn scope(&self) -> &str;
}

pub trait Transformer: Send + Sync {
    /// `Ok(None)` drops the record.
    fn transform(&self, record: Record) -> Result<Option<Record>>;

    fn scope(&self) -> &str;
}

#[async_trait]
pub trait Loader: Send + Sync {
    /// 將記錄寫入中間檔案，回傳寫入的記錄數
    async fn load(&self, records: Vec<Record>) -> Result<usize>;

    /// Runs once the publisher has committed the staged files.
    async fn on_publish_success(&self) -> Result<()> {
        Ok(())
    }

    fn scope(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub nodes: usize,
    pub relationships: usize,
    pub documents: usize,
}

#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self) -> Result<PublishSummary>;

    fn scope(&self) -> &str;
}
