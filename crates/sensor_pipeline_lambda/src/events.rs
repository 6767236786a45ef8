//! Inbound Lambda event envelopes, decoded at the boundary.

use std::collections::HashMap;

use sensor_pipeline_core::contract::{AlertPayload, RawReading};
use serde::Deserialize;
use serde_json::Value;

use crate::error::HandlerError;

pub use aws_lambda_events::event::s3::{S3Event, S3EventRecord};
pub use aws_lambda_events::event::sqs::{SqsEvent, SqsMessage};

/// Bucket plus decoded key of one object-created notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

/// Notification keys are form-encoded (`+` for space, `%XX` escapes).
pub fn object_location(record: &S3EventRecord) -> Result<ObjectLocation, HandlerError> {
    let bucket = record
        .s3
        .bucket
        .name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| HandlerError::malformed("S3 record has no bucket name"))?;
    let raw_key = record.s3.object.key.as_deref().unwrap_or_default();
    let plus_decoded = raw_key.replace('+', " ");
    let key = urlencoding::decode(&plus_decoded)
        .map_err(|error| HandlerError::malformed(format!("invalid S3 object key: {error}")))?
        .into_owned();
    if key.is_empty() {
        return Err(HandlerError::malformed("S3 object key cannot be empty"));
    }
    Ok(ObjectLocation {
        bucket: bucket.to_string(),
        key,
    })
}

pub fn decode_s3_event(event: Value) -> Result<S3Event, HandlerError> {
    if !event.get("Records").is_some_and(Value::is_array) {
        return Err(HandlerError::malformed(
            "invalid S3 notification: missing Records array",
        ));
    }
    serde_json::from_value(event)
        .map_err(|error| HandlerError::malformed(format!("invalid S3 notification: {error}")))
}

/// The topic rule either lands messages in the raw bucket or invokes the
/// preprocessor with the message itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PreprocessorEvent {
    ObjectCreated(S3Event),
    Direct(RawReading),
}

pub fn decode_preprocessor_event(event: Value) -> Result<PreprocessorEvent, HandlerError> {
    if event.get("Records").is_some() {
        return decode_s3_event(event).map(PreprocessorEvent::ObjectCreated);
    }
    decode_raw_reading(event).map(PreprocessorEvent::Direct)
}

pub fn decode_raw_reading(value: Value) -> Result<RawReading, HandlerError> {
    serde_json::from_value(value)
        .map_err(|error| HandlerError::malformed(format!("invalid sensor reading: {error}")))
}

pub fn decode_raw_reading_bytes(body: &[u8]) -> Result<RawReading, HandlerError> {
    serde_json::from_slice(body)
        .map_err(|error| HandlerError::malformed(format!("invalid sensor reading: {error}")))
}

pub fn message_json_body(message: &SqsMessage) -> Result<Value, HandlerError> {
    let body = message
        .body
        .as_deref()
        .ok_or_else(|| HandlerError::malformed("SQS message has no body"))?;
    serde_json::from_str(body)
        .map_err(|error| HandlerError::malformed(format!("SQS body is not valid JSON: {error}")))
}

pub fn decode_sqs_event(event: Value) -> Result<SqsEvent, HandlerError> {
    serde_json::from_value(event)
        .map_err(|error| HandlerError::malformed(format!("invalid SQS event: {error}")))
}

/// Alerts arrive wrapped in an EventBridge envelope (`detail`); a bare payload
/// is accepted as well.
pub fn decode_alert_event(event: Value) -> Result<AlertPayload, HandlerError> {
    let payload = match event {
        Value::Object(mut object) => match object.remove("detail") {
            Some(detail) => detail,
            None => Value::Object(object),
        },
        _ => return Err(HandlerError::malformed("alert event must be a JSON object")),
    };
    serde_json::from_value(payload)
        .map_err(|error| HandlerError::malformed(format!("invalid alert payload: {error}")))
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiGatewayRequest {
    pub http_method: String,
    /// Absent means `/`; an explicit `null` stays `None` and routes nowhere.
    #[serde(default = "root_path")]
    pub path: Option<String>,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

fn root_path() -> Option<String> {
    Some("/".to_string())
}

impl ApiGatewayRequest {
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|params| params.get(name))
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

pub fn decode_api_request(event: Value) -> Result<ApiGatewayRequest, HandlerError> {
    serde_json::from_value(event)
        .map_err(|error| HandlerError::malformed(format!("invalid API Gateway request: {error}")))
}
