pub mod etl;
pub mod job;
pub mod sequence;

pub use crate::domain::model::{DashboardSearchDocument, Record, TableMetadata};
pub use crate::domain::ports::{Extractor, Loader, PublishSummary, Publisher, Transformer};
pub use crate::utils::error::{EtlError, Result};
pub use etl::{DefaultJob, DefaultTask, JobReport, NoopTransformer, TaskReport};
pub use job::{Job, Launch};
pub use sequence::{JobOutcome, JobSequence};
