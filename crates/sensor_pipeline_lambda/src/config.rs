//! Per-function configuration resolved from the Lambda environment.
//!
//! Every value is an opaque identifier supplied by the deployment stack.
//! Lookups go through a closure so tests never touch the process env.

use crate::error::HandlerError;

pub const TABLE_VARS: &[&str] = &["DYNAMODB_TABLE", "DEVICE_TABLE"];
pub const ANOMALY_TOPIC_VARS: &[&str] = &["ANOMALY_TOPIC_ARN", "ALERT_TOPIC"];
pub const ALERT_TOPIC_VARS: &[&str] = &["ALERT_TOPIC_ARN", "ALERT_TOPIC"];
pub const PROCESSED_BUCKET_VARS: &[&str] = &["PROCESSED_BUCKET", "PROCESSED_BUCKET_NAME"];
pub const PROCESSED_PREFIX_VAR: &str = "PROCESSED_PREFIX";
pub const ENDPOINT_VAR: &str = "SAGEMAKER_ENDPOINT";
pub const RETENTION_VAR: &str = "RECORD_TTL_DAYS";
pub const DEFAULT_PROCESSED_PREFIX: &str = "processed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessorConfig {
    pub table_name: String,
    pub anomaly_topic_arn: String,
    pub processed_bucket: Option<String>,
    pub processed_prefix: String,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAnalysisConfig {
    pub table_name: String,
    pub alert_topic_arn: String,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlConfig {
    pub table_name: String,
    pub alert_topic_arn: String,
    pub endpoint_name: String,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertConfig {
    pub table_name: String,
    pub alert_topic_arn: String,
    pub retention_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub table_name: String,
}

pub fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, names: &[&str]) -> Option<String> {
    names.iter().copied().find_map(|name| {
        lookup(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    names: &[&str],
) -> Result<String, HandlerError> {
    optional(lookup, names)
        .ok_or_else(|| HandlerError::Config(format!("{} must be configured", names.join(" or "))))
}

fn retention_days(lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<u32>, HandlerError> {
    let Some(raw) = optional(lookup, &[RETENTION_VAR]) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => Err(HandlerError::Config(format!(
            "{RETENTION_VAR} must be a positive integer, got '{raw}'"
        ))),
        Ok(days) => Ok(Some(days)),
    }
}

impl PreprocessorConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HandlerError> {
        Ok(Self {
            table_name: required(&lookup, TABLE_VARS)?,
            anomaly_topic_arn: required(&lookup, ANOMALY_TOPIC_VARS)?,
            processed_bucket: optional(&lookup, PROCESSED_BUCKET_VARS),
            processed_prefix: optional(&lookup, &[PROCESSED_PREFIX_VAR])
                .unwrap_or_else(|| DEFAULT_PROCESSED_PREFIX.to_string()),
            retention_days: retention_days(&lookup)?,
        })
    }

    pub fn from_env() -> Result<Self, HandlerError> {
        Self::from_lookup(env_lookup)
    }
}

impl ImageAnalysisConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HandlerError> {
        Ok(Self {
            table_name: required(&lookup, TABLE_VARS)?,
            alert_topic_arn: required(&lookup, ALERT_TOPIC_VARS)?,
            retention_days: retention_days(&lookup)?,
        })
    }

    pub fn from_env() -> Result<Self, HandlerError> {
        Self::from_lookup(env_lookup)
    }
}

impl MlConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HandlerError> {
        Ok(Self {
            table_name: required(&lookup, TABLE_VARS)?,
            alert_topic_arn: required(&lookup, ALERT_TOPIC_VARS)?,
            endpoint_name: required(&lookup, &[ENDPOINT_VAR])?,
            retention_days: retention_days(&lookup)?,
        })
    }

    pub fn from_env() -> Result<Self, HandlerError> {
        Self::from_lookup(env_lookup)
    }
}

impl AlertConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HandlerError> {
        Ok(Self {
            table_name: required(&lookup, TABLE_VARS)?,
            alert_topic_arn: required(&lookup, ALERT_TOPIC_VARS)?,
            retention_days: retention_days(&lookup)?,
        })
    }

    pub fn from_env() -> Result<Self, HandlerError> {
        Self::from_lookup(env_lookup)
    }
}

impl ApiConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, HandlerError> {
        Ok(Self {
            table_name: required(&lookup, TABLE_VARS)?,
        })
    }

    pub fn from_env() -> Result<Self, HandlerError> {
        Self::from_lookup(env_lookup)
    }
}
