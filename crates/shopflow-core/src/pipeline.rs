//! Extract -> transform -> aggregate -> load, with stage-level retries.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use shopflow_bucket::BucketStore;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::datasets::{Dataset, Metric};
use crate::error::{PipelineError, Result, Stage};
use crate::extract::extract_datasets;
use crate::load::load_outputs;
use crate::metrics::build_metrics;
use crate::retry::with_retry;
use crate::summary::ItemSummary;
use crate::transform::transform_datasets;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Extracting,
    Transforming,
    Aggregating,
    Loading,
    Succeeded,
    Failed,
}

impl From<Stage> for RunState {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Extract => RunState::Extracting,
            Stage::Transform => RunState::Transforming,
            Stage::Aggregate => RunState::Aggregating,
            Stage::Load => RunState::Loading,
        }
    }
}

/// State of a single run. Nothing here outlives the run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub bucket: String,
    pub state: RunState,
    pub stage_attempts: BTreeMap<Stage, u32>,
    pub extract: ItemSummary,
    pub clean_tables: Vec<Dataset>,
    pub metric_tables: Vec<Metric>,
    pub load: ItemSummary,
}

impl PipelineRun {
    fn start(bucket: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            bucket: bucket.to_string(),
            state: RunState::Extracting,
            stage_attempts: BTreeMap::new(),
            extract: ItemSummary::default(),
            clean_tables: Vec::new(),
            metric_tables: Vec::new(),
            load: ItemSummary::default(),
        }
    }

    fn transition(&mut self, next: RunState) {
        info!(from = ?self.state, to = ?next, "pipeline state change");
        self.state = next;
    }

    pub fn expected_outputs(&self) -> usize {
        self.clean_tables.len() + self.metric_tables.len()
    }
}

/// How a run that was not aborted ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Every expected output was stored.
    Completed(PipelineRun),
    /// The pipeline ran to the end but at least one upload failed.
    Incomplete(PipelineRun),
}

impl RunOutcome {
    pub fn run(&self) -> &PipelineRun {
        match self {
            RunOutcome::Completed(run) | RunOutcome::Incomplete(run) => run,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

pub struct Pipeline {
    store: Arc<dyn BucketStore>,
    config: PipelineConfig,
    today: Option<NaiveDate>,
}

impl Pipeline {
    pub fn new(store: Arc<dyn BucketStore>, config: PipelineConfig) -> Self {
        Self {
            store,
            config,
            today: None,
        }
    }

    /// Pins the reference date used for age calculation.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every stage once, in order. Returns `Err(StageFailed)` when a stage
    /// exhausts its retries; later stages are then not attempted.
    pub async fn run(&self) -> Result<RunOutcome> {
        let run = PipelineRun::start(self.store.bucket());
        let span = info_span!("pipeline_run", run_id = %run.run_id, bucket = %run.bucket);
        self.execute(run).instrument(span).await
    }

    async fn execute(&self, mut run: PipelineRun) -> Result<RunOutcome> {
        info!("starting data processing");
        let store = self.store.as_ref();
        let today = self.today.unwrap_or_else(|| Local::now().date_naive());

        let extraction = self
            .stage(&mut run, Stage::Extract, || extract_datasets(store))
            .await?;
        run.extract = extraction.summary;
        let raw = &extraction.tables;

        let clean = self
            .stage(&mut run, Stage::Transform, || async move {
                transform_datasets(raw, today).map_err(PipelineError::from)
            })
            .await?;
        run.clean_tables = clean.keys().copied().collect();
        let clean = &clean;

        let metrics = self
            .stage(&mut run, Stage::Aggregate, || async move {
                build_metrics(clean).map_err(PipelineError::from)
            })
            .await?;
        run.metric_tables = metrics.keys().copied().collect();
        let metrics = &metrics;

        let loaded = self
            .stage(&mut run, Stage::Load, || load_outputs(store, clean, metrics))
            .await?;
        run.load = loaded;

        let stored = run.load.succeeded_count();
        let expected = run.expected_outputs();
        if run.load.is_complete() {
            run.transition(RunState::Succeeded);
            info!(stored, expected, "data processing pipeline completed");
            Ok(RunOutcome::Completed(run))
        } else {
            run.transition(RunState::Failed);
            error!(stored, expected, "failed to upload processed data");
            Ok(RunOutcome::Incomplete(run))
        }
    }

    async fn stage<T, F, Fut>(&self, run: &mut PipelineRun, stage: Stage, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        run.transition(stage.into());
        let policy = self.config.retry.for_stage(stage);
        match with_retry(stage, policy, operation).await {
            Ok((value, attempts)) => {
                run.stage_attempts.insert(stage, attempts);
                Ok(value)
            }
            Err(err) => {
                run.transition(RunState::Failed);
                error!(stage = %stage, error = %err, "data processing aborted");
                Err(err)
            }
        }
    }
}
