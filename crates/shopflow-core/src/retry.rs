//! Stage-level retry. Item-level failures never reach this layer; only errors
//! that escape a whole stage are repeated here.

use std::future::Future;
use std::time::{Duration, TryFromFloatSecsError};

use tracing::{error, warn};

use crate::error::{PipelineError, Result, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    pub delay: Duration,
}

impl StagePolicy {
    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }

    /// Fails when the scaled delay is negative, not finite, or too large for a `Duration`.
    pub fn scaled(self, factor: f64) -> std::result::Result<Self, TryFromFloatSecsError> {
        let delay = Duration::try_from_secs_f64(self.delay.as_secs_f64() * factor)?;
        Ok(Self { delay, ..self })
    }

    pub fn without_delay(self) -> Self {
        Self {
            delay: Duration::ZERO,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    pub extract: StagePolicy,
    pub transform: StagePolicy,
    pub aggregate: StagePolicy,
    pub load: StagePolicy,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            extract: StagePolicy::new(2, Duration::from_secs(30)),
            transform: StagePolicy::new(1, Duration::ZERO),
            aggregate: StagePolicy::new(1, Duration::ZERO),
            load: StagePolicy::new(2, Duration::from_secs(45)),
        }
    }
}

impl RetrySettings {
    /// Default retry counts without any waiting between attempts.
    pub fn immediate() -> Self {
        let defaults = Self::default();
        Self {
            extract: defaults.extract.without_delay(),
            transform: defaults.transform.without_delay(),
            aggregate: defaults.aggregate.without_delay(),
            load: defaults.load.without_delay(),
        }
    }

    pub fn scaled(self, factor: f64) -> std::result::Result<Self, TryFromFloatSecsError> {
        Ok(Self {
            extract: self.extract.scaled(factor)?,
            transform: self.transform.scaled(factor)?,
            aggregate: self.aggregate.scaled(factor)?,
            load: self.load.scaled(factor)?,
        })
    }

    pub fn for_stage(&self, stage: Stage) -> StagePolicy {
        match stage {
            Stage::Extract => self.extract,
            Stage::Transform => self.transform,
            Stage::Aggregate => self.aggregate,
            Stage::Load => self.load,
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// exhausts `policy`. Returns the value with the number of attempts it took.
pub async fn with_retry<F, Fut, T>(stage: Stage, policy: StagePolicy, operation: F) -> Result<(T, u32)>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok((value, attempt)),
            Err(err) => {
                if !err.is_retryable() || attempt > policy.max_retries {
                    error!(stage = %stage, attempts = attempt, error = %err, "stage failed");
                    return Err(PipelineError::StageFailed {
                        stage,
                        attempts: attempt,
                        source: Box::new(err),
                    });
                }

                warn!(
                    stage = %stage,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = policy.delay.as_millis() as u64,
                    error = %err,
                    "retrying stage after error"
                );
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopflow_bucket::BucketError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn recovers_after_transient_errors() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = StagePolicy::new(2, Duration::ZERO);
        let (value, attempts) = with_retry(Stage::Extract, policy, || async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(PipelineError::Storage(BucketError::Sdk("timeout".into())))
            } else {
                Ok(7)
            }
        })
        .await
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = StagePolicy::new(1, Duration::ZERO);
        let err = with_retry(Stage::Transform, policy, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(PipelineError::Storage(BucketError::Sdk("reset".into())))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            err,
            PipelineError::StageFailed {
                stage: Stage::Transform,
                attempts: 2,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let policy = StagePolicy::new(5, Duration::ZERO);
        let err = with_retry(Stage::Load, policy, || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(PipelineError::BucketMissing("shop".into()))
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, PipelineError::StageFailed { attempts: 1, .. }));
    }

    #[test]
    fn defaults_match_stage_profiles() {
        let settings = RetrySettings::default();
        assert_eq!(settings.for_stage(Stage::Extract).max_retries, 2);
        assert_eq!(settings.for_stage(Stage::Load).delay, Duration::from_secs(45));
        assert_eq!(settings.for_stage(Stage::Aggregate).max_retries, 1);
        assert!(RetrySettings::immediate().load.delay.is_zero());
        assert_eq!(RetrySettings::immediate().load.max_retries, 2);
    }

    #[test]
    fn scaling_rejects_delays_that_overflow() {
        let halved = RetrySettings::default().scaled(0.5).unwrap();
        assert_eq!(halved.extract.delay, Duration::from_secs(15));
        assert!(RetrySettings::default().scaled(1e300).is_err());
    }
}
