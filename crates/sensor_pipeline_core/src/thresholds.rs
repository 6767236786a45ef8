use chrono::{DateTime, Utc};

use crate::contract::{
    format_timestamp, record_ttl, require_device_id, resolve_timestamp, Measurement,
    MeasurementStatus, RawReading, RecordType, SensorRecord, ValidationError,
};

pub const TEMPERATURE_WARNING_C: f64 = 75.0;
pub const TEMPERATURE_CRITICAL_C: f64 = 85.0;
pub const VIBRATION_WARNING_G: f64 = 0.5;
pub const VIBRATION_CRITICAL_G: f64 = 0.8;

/// Measured fields, in the fixed order alerts report them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeasurementKind {
    Temperature,
    Vibration,
}

impl MeasurementKind {
    pub const ALL: [MeasurementKind; 2] = [Self::Temperature, Self::Vibration];

    pub fn label(self) -> &'static str {
        match self {
            Self::Temperature => "Temperature",
            Self::Vibration => "Vibration",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Self::Temperature => "°C",
            Self::Vibration => "g",
        }
    }

    pub fn warning_threshold(self) -> f64 {
        match self {
            Self::Temperature => TEMPERATURE_WARNING_C,
            Self::Vibration => VIBRATION_WARNING_G,
        }
    }

    pub fn critical_threshold(self) -> f64 {
        match self {
            Self::Temperature => TEMPERATURE_CRITICAL_C,
            Self::Vibration => VIBRATION_CRITICAL_G,
        }
    }
}

pub fn classify(kind: MeasurementKind, value: f64) -> MeasurementStatus {
    if value > kind.critical_threshold() {
        MeasurementStatus::Critical
    } else if value > kind.warning_threshold() {
        MeasurementStatus::Warning
    } else {
        MeasurementStatus::Normal
    }
}

pub fn analyze(kind: MeasurementKind, value: Option<f64>) -> Measurement {
    let value = value.unwrap_or(0.0);
    Measurement {
        value,
        status: classify(kind, value),
        threshold: kind.warning_threshold(),
    }
}

pub fn process_reading(
    reading: &RawReading,
    now: DateTime<Utc>,
    retention_days: Option<u32>,
) -> Result<SensorRecord, ValidationError> {
    let device_id = require_device_id(Some(&reading.device_id))?;
    for (kind, value) in [
        (MeasurementKind::Temperature, reading.temperature),
        (MeasurementKind::Vibration, reading.vibration),
    ] {
        if value.is_some_and(|number| !number.is_finite()) {
            return Err(ValidationError::new(format!(
                "{} reading must be a finite number",
                kind.label()
            )));
        }
    }

    Ok(SensorRecord {
        device_id,
        timestamp: resolve_timestamp(reading.timestamp.as_ref(), now)?,
        record_type: RecordType::Sensor,
        temperature: analyze(MeasurementKind::Temperature, reading.temperature),
        vibration: analyze(MeasurementKind::Vibration, reading.vibration),
        processed: true,
        processed_at: format_timestamp(now),
        ttl: record_ttl(now, retention_days),
    })
}
