//! Alert derivation and the notification gates used by the handlers.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::contract::{
    format_timestamp, record_ttl, require_device_id, AlertPayload, AlertRecord, DetectedLabel,
    MeasurementReport, MeasurementStatus, RecordType, SensorRecord, Severity, ValidationError,
    DEFAULT_ALERT_TYPE, NEW_ALERT_STATUS,
};
use crate::thresholds::MeasurementKind;

pub const NO_ISSUES_MESSAGE: &str = "No specific issues detected";
pub const DEFECT_MIN_CONFIDENCE: f64 = 80.0;
pub const DEFECT_KEYWORDS: [&str; 9] = [
    "crack",
    "scratch",
    "dent",
    "rust",
    "corrosion",
    "damage",
    "defect",
    "broken",
    "leak",
];
pub const PREDICTION_ANOMALY_THRESHOLD: f64 = 0.8;

impl AlertPayload {
    /// Reports that are present, in the fixed temperature-then-vibration order.
    pub fn measurements(&self) -> impl Iterator<Item = (MeasurementKind, &MeasurementReport)> {
        MeasurementKind::ALL
            .into_iter()
            .filter_map(|kind| self.report(kind).map(|report| (kind, report)))
    }

    pub fn report(&self, kind: MeasurementKind) -> Option<&MeasurementReport> {
        match kind {
            MeasurementKind::Temperature => self.temperature.as_ref(),
            MeasurementKind::Vibration => self.vibration.as_ref(),
        }
    }
}

pub fn calculate_severity(payload: &AlertPayload) -> Severity {
    let worst = payload
        .measurements()
        .filter_map(|(_, report)| report.status)
        .max();

    match worst {
        Some(MeasurementStatus::Critical) => Severity::Critical,
        Some(MeasurementStatus::Warning) => Severity::Warning,
        _ => Severity::Info,
    }
}

pub fn generate_alert_message(payload: &AlertPayload) -> String {
    let messages: Vec<String> = payload
        .measurements()
        .filter(|(_, report)| {
            report
                .status
                .is_some_and(|status| status != MeasurementStatus::Normal)
        })
        .map(|(kind, report)| {
            format!(
                "{} {}{unit} exceeds threshold {}{unit}",
                kind.label(),
                format_number(report.value),
                format_number(report.threshold),
                unit = kind.unit(),
            )
        })
        .collect();

    if messages.is_empty() {
        NO_ISSUES_MESSAGE.to_string()
    } else {
        messages.join(" and ")
    }
}

fn format_number(value: Option<f64>) -> String {
    match value {
        Some(number) => number.to_string(),
        None => "n/a".to_string(),
    }
}

pub fn alert_id(now: DateTime<Utc>) -> String {
    format!("alert_{}", now.format("%Y%m%d%H%M%S"))
}

pub fn process_alert(
    payload: &AlertPayload,
    now: DateTime<Utc>,
    retention_days: Option<u32>,
) -> Result<AlertRecord, ValidationError> {
    let device_id = require_device_id(payload.device_id.as_deref())?;
    let alert_type = payload
        .alert_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_ALERT_TYPE)
        .to_string();

    Ok(AlertRecord {
        alert_id: alert_id(now),
        device_id,
        timestamp: format_timestamp(now),
        record_type: RecordType::Alert,
        alert_type,
        severity: calculate_severity(payload),
        message: generate_alert_message(payload),
        status: NEW_ALERT_STATUS.to_string(),
        ttl: record_ttl(now, retention_days),
    })
}

/// Preprocessor gate: a record is anomalous when any measurement is critical.
pub fn is_anomaly(record: &SensorRecord) -> bool {
    [record.temperature, record.vibration]
        .iter()
        .any(|measurement| measurement.status == MeasurementStatus::Critical)
}

pub fn is_defect_label(label: &DetectedLabel) -> bool {
    if label.confidence < DEFECT_MIN_CONFIDENCE {
        return false;
    }
    let name = label.name.to_ascii_lowercase();
    DEFECT_KEYWORDS.iter().any(|keyword| name.contains(keyword))
}

pub fn has_defects(labels: &[DetectedLabel]) -> bool {
    labels.iter().any(is_defect_label)
}

pub fn max_confidence(labels: &[DetectedLabel]) -> f64 {
    labels
        .iter()
        .map(|label| label.confidence)
        .fold(0.0, f64::max)
}

/// Pulls an anomaly score out of an inference response. Endpoints answer with
/// `{"anomaly_score": x}`, `{"score": x}`, `{"predictions": [x, ...]}` or a
/// bare number.
pub fn anomaly_score(prediction: &Value) -> Option<f64> {
    match prediction {
        Value::Number(number) => number.as_f64(),
        Value::Object(object) => ["anomaly_score", "anomalyScore", "score"]
            .iter()
            .find_map(|key| object.get(*key).and_then(Value::as_f64))
            .or_else(|| object.get("predictions").and_then(first_score)),
        Value::Array(_) => first_score(prediction),
        _ => None,
    }
}

fn first_score(value: &Value) -> Option<f64> {
    let first = value.as_array()?.first()?;
    match first {
        Value::Number(number) => number.as_f64(),
        Value::Object(_) => anomaly_score(first),
        _ => None,
    }
}

pub fn is_predicted_anomaly(score: Option<f64>) -> bool {
    score.is_some_and(|value| value >= PREDICTION_ANOMALY_THRESHOLD)
}
