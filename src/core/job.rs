use crate::config::job_config::{ConfigEntries, ConfigMap};
use crate::core::etl::{DefaultJob, DefaultTask, JobReport};
use crate::core::Publisher;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use async_trait::async_trait;

/// 一個完整的 ETL job：依參數組出型別化的設定，再由設定組出 task 與 publisher
pub trait Job: Send + Sync {
    const NAME: &'static str;

    type Config: Validate + ConfigEntries + Send + Sync;

    /// Builds the configuration for one run. Called once per launch, so values that must
    /// be unique per run (index names) are generated here.
    fn config(&self) -> Self::Config;

    fn task(&self, config: &Self::Config) -> Result<DefaultTask>;

    fn publisher(&self, config: &Self::Config) -> Result<Box<dyn Publisher>>;
}

/// Object-safe view of a [`Job`], used by [`crate::core::JobSequence`].
#[async_trait]
pub trait Launch: Send + Sync {
    fn name(&self) -> &str;

    /// Flattened `scope.option = value` view of everything the job will run with.
    fn describe(&self) -> Result<ConfigMap>;

    /// Checks the configuration without touching any external system.
    fn validate(&self) -> Result<()>;

    async fn launch(&self) -> Result<JobReport>;
}

#[async_trait]
impl<J: Job> Launch for J {
    fn name(&self) -> &str {
        J::NAME
    }

    fn describe(&self) -> Result<ConfigMap> {
        self.config().entries()
    }

    fn validate(&self) -> Result<()> {
        self.config().validate()
    }

    async fn launch(&self) -> Result<JobReport> {
        let config = self.config();
        // 任何遠端呼叫之前先驗證設定
        config.validate()?;

        let job = DefaultJob::new(self.task(&config)?, self.publisher(&config)?);
        job.launch().await
    }
}
