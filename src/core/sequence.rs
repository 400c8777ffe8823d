use crate::core::etl::JobReport;
use crate::core::job::Launch;
use crate::config::job_config::ConfigMap;
use crate::utils::error::Result;

#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_name: String,
    pub report: JobReport,
}

/// 依序執行 job，任一個失敗即停止，後面的 job 不會啟動。
/// 所有 job 的設定都會在第一個 job 啟動前先驗證。
#[derive(Default)]
pub struct JobSequence {
    jobs: Vec<Box<dyn Launch>>,
}

impl JobSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_job(&mut self, job: Box<dyn Launch>) {
        self.jobs.push(job);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn describe_all(&self) -> Result<Vec<(String, ConfigMap)>> {
        self.jobs
            .iter()
            .map(|job| Ok((job.name().to_string(), job.describe()?)))
            .collect()
    }

    /// Validates every job, stopping at the first invalid one.
    pub fn validate_all(&self) -> Result<()> {
        for job in &self.jobs {
            if let Err(e) = job.validate() {
                tracing::error!("❌ Invalid configuration for {}: {}", job.name(), e);
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn execute_all(&self) -> Result<Vec<JobOutcome>> {
        self.validate_all()?;

        let mut outcomes = Vec::with_capacity(self.jobs.len());

        for (position, job) in self.jobs.iter().enumerate() {
            tracing::info!(
                "🚀 Launching job {}/{}: {}",
                position + 1,
                self.jobs.len(),
                job.name()
            );

            match job.launch().await {
                Ok(report) => {
                    tracing::info!(
                        "✅ Job finished: {} (extracted: {}, loaded: {}, nodes: {}, relationships: {}, documents: {}, duration: {:?})",
                        job.name(),
                        report.task.extracted,
                        report.task.loaded,
                        report.published.nodes,
                        report.published.relationships,
                        report.published.documents,
                        report.duration
                    );
                    outcomes.push(JobOutcome {
                        job_name: job.name().to_string(),
                        report,
                    });
                }
                Err(e) => {
                    tracing::error!("❌ Job failed: {}: {}", job.name(), e);
                    let skipped = self.jobs.len() - position - 1;
                    if skipped > 0 {
                        tracing::warn!("⏭️ Skipping {} remaining job(s)", skipped);
                    }
                    return Err(e);
                }
            }
        }

        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::EtlError;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct MockJob {
        name: String,
        fail: bool,
        invalid: bool,
        launched: Arc<Mutex<Vec<String>>>,
    }

    impl MockJob {
        fn boxed(name: &str, fail: bool, launched: &Arc<Mutex<Vec<String>>>) -> Box<dyn Launch> {
            Box::new(Self {
                name: name.to_string(),
                fail,
                invalid: false,
                launched: launched.clone(),
            })
        }

        fn invalid(name: &str, launched: &Arc<Mutex<Vec<String>>>) -> Box<dyn Launch> {
            Box::new(Self {
                name: name.to_string(),
                fail: false,
                invalid: true,
                launched: launched.clone(),
            })
        }
    }

    #[async_trait]
    impl Launch for MockJob {
        fn name(&self) -> &str {
            &self.name
        }

        fn describe(&self) -> Result<ConfigMap> {
            let mut map = ConfigMap::new();
            map.insert_scoped(&self.name, "fail", self.fail)?;
            Ok(map)
        }

        fn validate(&self) -> Result<()> {
            if self.invalid {
                return Err(EtlError::missing(format!("{}.endpoint", self.name)));
            }
            Ok(())
        }

        async fn launch(&self) -> Result<JobReport> {
            self.launched.lock().unwrap().push(self.name.clone());
            if self.fail {
                return Err(EtlError::processing(format!("{} broke", self.name)));
            }
            Ok(JobReport::default())
        }
    }

    #[tokio::test]
    async fn test_jobs_run_in_insertion_order() {
        let launched = Arc::new(Mutex::new(Vec::new()));
        let mut sequence = JobSequence::new();
        sequence.add_job(MockJob::boxed("first", false, &launched));
        sequence.add_job(MockJob::boxed("second", false, &launched));

        let outcomes = sequence.execute_all().await.unwrap();

        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].job_name, "first");
        assert_eq!(*launched.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failure_stops_remaining_jobs() {
        let launched = Arc::new(Mutex::new(Vec::new()));
        let mut sequence = JobSequence::new();
        sequence.add_job(MockJob::boxed("first", true, &launched));
        sequence.add_job(MockJob::boxed("second", false, &launched));

        let err = sequence.execute_all().await.unwrap_err();

        assert!(matches!(err, EtlError::ProcessingError { .. }));
        assert_eq!(*launched.lock().unwrap(), vec!["first"]);
    }

    #[tokio::test]
    async fn test_invalid_later_job_stops_before_first_launch() {
        let launched = Arc::new(Mutex::new(Vec::new()));
        let mut sequence = JobSequence::new();
        sequence.add_job(MockJob::boxed("first", false, &launched));
        sequence.add_job(MockJob::invalid("second", &launched));

        let err = sequence.execute_all().await.unwrap_err();

        assert!(matches!(err, EtlError::MissingConfigError { field } if field == "second.endpoint"));
        assert!(launched.lock().unwrap().is_empty());
    }

    #[test]
    fn test_describe_all_keeps_order() {
        let launched = Arc::new(Mutex::new(Vec::new()));
        let mut sequence = JobSequence::new();
        sequence.add_job(MockJob::boxed("a", false, &launched));
        sequence.add_job(MockJob::boxed("b", true, &launched));

        let described = sequence.describe_all().unwrap();
        let names: Vec<&str> = described.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(described[1].1.get("b.fail"), Some(&serde_json::json!(true)));
        assert!(launched.lock().unwrap().is_empty());
    }
}
