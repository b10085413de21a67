// crates/shopflow-core/src/error.rs

use std::fmt;

use polars::error::PolarsError;
use serde::Serialize;
use shopflow_bucket::BucketError;
use thiserror::Error;

use crate::datasets::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extract,
    Transform,
    Aggregate,
    Load,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::Transform => "transform",
            Stage::Aggregate => "aggregate",
            Stage::Load => "load",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(#[from] BucketError),

    #[error("Bucket '{0}' does not exist")]
    BucketMissing(String),

    #[error("Failed to parse {dataset}: {source}")]
    Parse {
        dataset: Dataset,
        #[source]
        source: PolarsError,
    },

    #[error("Computation failed: {0}")]
    Computation(#[from] PolarsError),

    #[error("{stage} stage failed after {attempts} attempt(s): {source}")]
    StageFailed {
        stage: Stage,
        attempts: u32,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Whether repeating the stage that raised this error could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::Storage(err) => err.is_transient(),
            PipelineError::Computation(_) => true,
            PipelineError::Configuration(_)
            | PipelineError::BucketMissing(_)
            | PipelineError::Parse { .. }
            | PipelineError::StageFailed { .. } => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
