use sensor_pipeline_core::contract::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    /// Input that failed to decode or validate at the event boundary.
    #[error("malformed input: {0}")]
    Malformed(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{service} request failed: {message}")]
    Dependency {
        service: &'static str,
        message: String,
    },
    #[error("failed to serialize {what}: {message}")]
    Serialization { what: &'static str, message: String },
}

impl HandlerError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn dependency(service: &'static str) -> impl FnOnce(String) -> Self {
        move |message| Self::Dependency { service, message }
    }

    pub fn serialization(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |error| Self::Serialization {
            what,
            message: error.to_string(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

impl From<ValidationError> for HandlerError {
    fn from(error: ValidationError) -> Self {
        Self::Malformed(error.message().to_string())
    }
}
