use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_ALERT_TYPE: &str = "unknown";
pub const NEW_ALERT_STATUS: &str = "new";
pub const QUALITY_CONTROL_ANALYSIS: &str = "quality_control";

/// Discriminates the record families that share the device table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Sensor,
    Alert,
    Analysis,
    Prediction,
}

impl RecordType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Alert => "alert",
            Self::Analysis => "analysis",
            Self::Prediction => "prediction",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementStatus {
    Normal,
    Warning,
    Critical,
}

impl MeasurementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "info" => Some(Self::Info),
            "warning" => Some(Self::Warning),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// A classified reading. `threshold` is the warning threshold of its kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub status: MeasurementStatus,
    pub threshold: f64,
}

/// Timestamps arrive either as ISO-8601 text or as epoch milliseconds
/// (the topic rule's `timestamp()` function).
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawTimestamp {
    Text(String),
    EpochMillis(i64),
}

/// Raw device message as published on `manufacturing/sensors/#`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RawReading {
    #[serde(alias = "deviceId")]
    pub device_id: String,
    #[serde(default)]
    pub timestamp: Option<RawTimestamp>,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub vibration: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SensorRecord {
    pub device_id: String,
    pub timestamp: String,
    pub record_type: RecordType,
    pub temperature: Measurement,
    pub vibration: Measurement,
    pub processed: bool,
    pub processed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

/// A measurement as reported inside an alert; every field may be missing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MeasurementReport {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub status: Option<MeasurementStatus>,
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl From<Measurement> for MeasurementReport {
    fn from(measurement: Measurement) -> Self {
        Self {
            value: Some(measurement.value),
            status: Some(measurement.status),
            threshold: Some(measurement.threshold),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(rename = "type", default)]
    pub alert_type: Option<String>,
    #[serde(default)]
    pub temperature: Option<MeasurementReport>,
    #[serde(default)]
    pub vibration: Option<MeasurementReport>,
}

impl From<&SensorRecord> for AlertPayload {
    fn from(record: &SensorRecord) -> Self {
        Self {
            device_id: Some(record.device_id.clone()),
            alert_type: Some("anomaly".to_string()),
            temperature: Some(record.temperature.into()),
            vibration: Some(record.vibration.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub alert_id: String,
    pub device_id: String,
    pub timestamp: String,
    pub record_type: RecordType,
    #[serde(rename = "type")]
    pub alert_type: String,
    pub severity: Severity,
    pub message: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedLabel {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisRecord {
    pub device_id: String,
    pub timestamp: String,
    pub record_type: RecordType,
    pub image_key: String,
    pub bucket: String,
    pub labels: Vec<DetectedLabel>,
    pub confidence: f64,
    pub analysis_type: String,
    pub defect_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub device_id: String,
    pub timestamp: String,
    pub record_type: RecordType,
    pub endpoint: String,
    pub prediction: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anomaly_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn resolve_timestamp(
    raw: Option<&RawTimestamp>,
    now: DateTime<Utc>,
) -> Result<String, ValidationError> {
    match raw {
        None => Ok(format_timestamp(now)),
        Some(RawTimestamp::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(format_timestamp(now))
            } else {
                Ok(trimmed.to_string())
            }
        }
        Some(RawTimestamp::EpochMillis(millis)) => Utc
            .timestamp_millis_opt(*millis)
            .single()
            .map(format_timestamp)
            .ok_or_else(|| ValidationError::new(format!("timestamp {millis} is out of range"))),
    }
}

/// Epoch-second expiry for the table's TTL attribute.
pub fn record_ttl(now: DateTime<Utc>, retention_days: Option<u32>) -> Option<i64> {
    retention_days.map(|days| (now + Duration::days(i64::from(days))).timestamp())
}

pub fn require_device_id(device_id: Option<&str>) -> Result<String, ValidationError> {
    match device_id.map(str::trim) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(ValidationError::new("deviceId must be a non-empty string")),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 14, 10, 30, 0)
            .single()
            .expect("valid fixed time")
    }

    #[test]
    fn raw_reading_accepts_camel_case_device_id() {
        let reading: RawReading =
            serde_json::from_value(json!({"deviceId": "press-7", "temperature": 71.5}))
                .expect("reading should decode");

        assert_eq!(reading.device_id, "press-7");
        assert_eq!(reading.temperature, Some(71.5));
        assert_eq!(reading.vibration, None);
    }

    #[test]
    fn raw_reading_requires_device_id() {
        let error = serde_json::from_value::<RawReading>(json!({"temperature": 80}))
            .expect_err("missing device id should fail");
        assert!(error.to_string().contains("device_id"));
    }

    #[test]
    fn epoch_millis_timestamps_are_normalized() {
        let resolved = resolve_timestamp(
            Some(&RawTimestamp::EpochMillis(1_771_065_000_000)),
            fixed_now(),
        )
        .expect("timestamp should resolve");
        assert_eq!(resolved, "2026-02-14T10:30:00.000000Z");
    }

    #[test]
    fn missing_timestamp_falls_back_to_invocation_time() {
        let resolved = resolve_timestamp(None, fixed_now()).expect("timestamp should resolve");
        assert_eq!(resolved, "2026-02-14T10:30:00.000000Z");
    }

    #[test]
    fn ttl_is_absent_without_retention() {
        assert_eq!(record_ttl(fixed_now(), None), None);
        assert_eq!(
            record_ttl(fixed_now(), Some(1)),
            Some(fixed_now().timestamp() + 86_400)
        );
    }

    #[test]
    fn sensor_record_serializes_with_table_attribute_names() {
        let record = SensorRecord {
            device_id: "press-7".to_string(),
            timestamp: "2026-02-14T10:30:00Z".to_string(),
            record_type: RecordType::Sensor,
            temperature: Measurement {
                value: 90.0,
                status: MeasurementStatus::Critical,
                threshold: 75.0,
            },
            vibration: Measurement {
                value: 0.2,
                status: MeasurementStatus::Normal,
                threshold: 0.5,
            },
            processed: true,
            processed_at: "2026-02-14T10:30:01Z".to_string(),
            ttl: None,
        };

        let value = serde_json::to_value(&record).expect("record should serialize");
        assert_eq!(value["deviceId"], json!("press-7"));
        assert_eq!(value["recordType"], json!("sensor"));
        assert_eq!(value["temperature"]["status"], json!("critical"));
        assert_eq!(value["processedAt"], json!("2026-02-14T10:30:01Z"));
        assert!(value.get("ttl").is_none());
    }

    #[test]
    fn blank_device_id_is_rejected() {
        let error = require_device_id(Some("  ")).expect_err("blank id should fail");
        assert_eq!(error.message(), "deviceId must be a non-empty string");
    }
}
