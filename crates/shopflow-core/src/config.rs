use shopflow_bucket::{S3Config, DEFAULT_REGION};

use crate::error::{PipelineError, Result};
use crate::retry::RetrySettings;

pub const BUCKET_VAR: &str = "AWS_S3_BUCKET_NAME";
pub const REGION_VAR: &str = "AWS_DEFAULT_REGION";
pub const ENDPOINT_VAR: &str = "S3_ENDPOINT_URL";
pub const FORCE_PATH_STYLE_VAR: &str = "S3_FORCE_PATH_STYLE";
pub const ACCESS_KEY_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const RETRY_DELAY_SCALE_VAR: &str = "SHOPFLOW_RETRY_DELAY_SCALE";

/// Everything a run needs, resolved once at process start.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub storage: S3Config,
    pub retry: RetrySettings,
}

impl PipelineConfig {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            storage: S3Config {
                bucket: bucket.into(),
                ..S3Config::default()
            },
            retry: RetrySettings::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bucket = get(BUCKET_VAR).ok_or_else(|| {
            PipelineError::Configuration(format!("{BUCKET_VAR} must be set"))
        })?;

        let force_path_style = match get(FORCE_PATH_STYLE_VAR) {
            Some(value) => parse_flag(&value).ok_or_else(|| {
                PipelineError::Configuration(format!(
                    "{FORCE_PATH_STYLE_VAR} must be true or false, got '{value}'"
                ))
            })?,
            None => false,
        };

        let retry = match get(RETRY_DELAY_SCALE_VAR) {
            Some(value) => {
                let factor = value
                    .parse::<f64>()
                    .ok()
                    .filter(|factor| factor.is_finite() && *factor >= 0.0)
                    .ok_or_else(|| {
                        PipelineError::Configuration(format!(
                            "{RETRY_DELAY_SCALE_VAR} must be a non-negative number, got '{value}'"
                        ))
                    })?;
                RetrySettings::default().scaled(factor).map_err(|err| {
                    PipelineError::Configuration(format!(
                        "{RETRY_DELAY_SCALE_VAR} '{value}' gives an unusable retry delay: {err}"
                    ))
                })?
            }
            None => RetrySettings::default(),
        };

        Ok(Self {
            storage: S3Config {
                bucket,
                region: get(REGION_VAR).unwrap_or_else(|| DEFAULT_REGION.to_string()),
                endpoint: get(ENDPOINT_VAR),
                access_key_id: get(ACCESS_KEY_VAR),
                secret_access_key: get(SECRET_KEY_VAR),
                force_path_style,
            },
            retry,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.storage.bucket
    }

    pub fn region(&self) -> &str {
        &self.storage.region
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_bucket_is_a_configuration_error() {
        let err = PipelineConfig::from_lookup(lookup(&[(REGION_VAR, "eu-west-1")])).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));

        let blank = PipelineConfig::from_lookup(lookup(&[(BUCKET_VAR, "  ")])).unwrap_err();
        assert!(matches!(blank, PipelineError::Configuration(_)));
    }

    #[test]
    fn region_defaults_to_us_east_1() {
        let config = PipelineConfig::from_lookup(lookup(&[(BUCKET_VAR, "shop-data")])).unwrap();
        assert_eq!(config.bucket(), "shop-data");
        assert_eq!(config.region(), "us-east-1");
        assert!(!config.storage.force_path_style);
        assert_eq!(config.retry, RetrySettings::default());
    }

    #[test]
    fn optional_settings_are_read() {
        let config = PipelineConfig::from_lookup(lookup(&[
            (BUCKET_VAR, "shop-data"),
            (REGION_VAR, "eu-central-1"),
            (ENDPOINT_VAR, "http://localhost:9000"),
            (FORCE_PATH_STYLE_VAR, "true"),
            (RETRY_DELAY_SCALE_VAR, "0"),
        ]))
        .unwrap();

        assert_eq!(config.region(), "eu-central-1");
        assert_eq!(
            config.storage.endpoint.as_deref(),
            Some("http://localhost:9000")
        );
        assert!(config.storage.force_path_style);
        assert_eq!(config.retry.extract.delay, Duration::ZERO);
        assert_eq!(config.retry.extract.max_retries, 2);
    }

    #[test]
    fn invalid_delay_scale_is_rejected() {
        let err = PipelineConfig::from_lookup(lookup(&[
            (BUCKET_VAR, "shop-data"),
            (RETRY_DELAY_SCALE_VAR, "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn overflowing_delay_scale_is_a_configuration_error() {
        let err = PipelineConfig::from_lookup(lookup(&[
            (BUCKET_VAR, "shop-data"),
            (RETRY_DELAY_SCALE_VAR, "1e300"),
        ]))
        .unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
