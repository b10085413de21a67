pub mod codec;
pub mod config;
pub mod datasets;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod load;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod seed;
pub mod summary;
pub mod transform;

pub use config::PipelineConfig;
pub use datasets::{CleanTables, Dataset, Metric, MetricTables, RawTables};
pub use error::{PipelineError, Result, Stage};
pub use pipeline::{Pipeline, PipelineRun, RunOutcome, RunState};
pub use summary::{ItemFailure, ItemSuccess, ItemSummary};
