use crate::core::{Extractor, Loader, PublishSummary, Publisher, Record, Transformer};
use crate::utils::error::Result;
use std::time::{Duration, Instant};

/// Pass-through transformer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTransformer;

impl Transformer for NoopTransformer {
    fn transform(&self, record: Record) -> Result<Option<Record>> {
        Ok(Some(record))
    }

    fn scope(&self) -> &str {
        "transformer.noop"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    pub extracted: usize,
    pub transformed: usize,
    pub loaded: usize,
}

/// extractor → transformer → loader
pub struct DefaultTask {
    extractor: Box<dyn Extractor>,
    transformer: Box<dyn Transformer>,
    loader: Box<dyn Loader>,
}

impl DefaultTask {
    pub fn new(extractor: Box<dyn Extractor>, loader: Box<dyn Loader>) -> Self {
        Self {
            extractor,
            transformer: Box::new(NoopTransformer),
            loader,
        }
    }

    pub fn with_transformer(mut self, transformer: Box<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn loader(&self) -> &dyn Loader {
        self.loader.as_ref()
    }

    pub async fn run(&self) -> Result<TaskReport> {
        tracing::debug!("📥 Extracting with {}", self.extractor.scope());
        let raw_records = self.extractor.extract().await?;
        let extracted = raw_records.len();
        tracing::info!("📥 Extracted {} record(s)", extracted);

        let mut records = Vec::with_capacity(extracted);
        for record in raw_records {
            if let Some(record) = self.transformer.transform(record)? {
                records.push(record);
            }
        }
        let transformed = records.len();
        tracing::debug!(
            "🔄 {} kept {} of {} record(s)",
            self.transformer.scope(),
            transformed,
            extracted
        );

        tracing::debug!("📤 Loading with {}", self.loader.scope());
        let loaded = self.loader.load(records).await?;
        tracing::info!("📤 Loaded {} record(s)", loaded);

        Ok(TaskReport {
            extracted,
            transformed,
            loaded,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobReport {
    pub task: TaskReport,
    pub published: PublishSummary,
    pub duration: Duration,
}

/// 執行 task 後再由 publisher 提交 staging 檔案
pub struct DefaultJob {
    task: DefaultTask,
    publisher: Box<dyn Publisher>,
}

impl DefaultJob {
    pub fn new(task: DefaultTask, publisher: Box<dyn Publisher>) -> Self {
        Self { task, publisher }
    }

    pub async fn launch(&self) -> Result<JobReport> {
        let start_time = Instant::now();

        let task = self.task.run().await?;

        tracing::debug!("🚚 Publishing with {}", self.publisher.scope());
        let published = self.publisher.publish().await?;

        // Staged files are only released once the publisher has committed them.
        self.task.loader().on_publish_success().await?;

        Ok(JobReport {
            task,
            published,
            duration: start_time.elapsed(),
        })
    }
}
