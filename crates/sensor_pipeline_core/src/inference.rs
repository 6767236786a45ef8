//! Feature extraction for the inference endpoint.
//!
//! Queue messages carry either a raw reading (`temperature: 81.2`) or a
//! processed record (`temperature: {value: 81.2, ...}`); both reduce to the
//! same feature vector.

use serde_json::{json, Map, Value};

use crate::contract::{require_device_id, ValidationError};
use crate::thresholds::MeasurementKind;

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceInput {
    pub device_id: String,
    pub timestamp: Option<String>,
    pub temperature: f64,
    pub vibration: f64,
}

impl InferenceInput {
    pub fn from_message(message: &Value) -> Result<Self, ValidationError> {
        let Some(object) = message.as_object() else {
            return Err(ValidationError::new("inference message must be a JSON object"));
        };

        let device_id = require_device_id(
            object
                .get("deviceId")
                .or_else(|| object.get("device_id"))
                .and_then(Value::as_str),
        )?;

        Ok(Self {
            device_id,
            timestamp: object
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string),
            temperature: feature(object, MeasurementKind::Temperature)?,
            vibration: feature(object, MeasurementKind::Vibration)?,
        })
    }

    /// SageMaker JSON convention: one row per instance, features in fixed
    /// temperature-then-vibration order.
    pub fn endpoint_payload(&self) -> Value {
        json!({ "instances": [[self.temperature, self.vibration]] })
    }
}

fn feature(object: &Map<String, Value>, kind: MeasurementKind) -> Result<f64, ValidationError> {
    let key = match kind {
        MeasurementKind::Temperature => "temperature",
        MeasurementKind::Vibration => "vibration",
    };
    match object.get(key) {
        None | Some(Value::Null) => Ok(0.0),
        Some(Value::Number(number)) => number
            .as_f64()
            .ok_or_else(|| ValidationError::new(format!("{key} must be numeric"))),
        Some(Value::Object(measurement)) => match measurement.get("value") {
            None | Some(Value::Null) => Ok(0.0),
            Some(value) => value
                .as_f64()
                .ok_or_else(|| ValidationError::new(format!("{key}.value must be numeric"))),
        },
        Some(_) => Err(ValidationError::new(format!(
            "{key} must be a number or a measurement object"
        ))),
    }
}
