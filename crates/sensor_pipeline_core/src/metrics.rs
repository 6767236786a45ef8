use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::alerting::is_anomaly;
use crate::contract::{Measurement, MeasurementStatus, SensorRecord};
use crate::thresholds::MeasurementKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementSummary {
    pub normal: usize,
    pub warning: usize,
    pub critical: usize,
    pub average: Option<f64>,
    pub max: Option<f64>,
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub record_count: usize,
    pub device_count: usize,
    pub anomalous_records: usize,
    pub temperature: MeasurementSummary,
    pub vibration: MeasurementSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_timestamp: Option<String>,
}

pub fn summarize(records: &[SensorRecord]) -> MetricsSummary {
    let devices: BTreeSet<&str> = records
        .iter()
        .map(|record| record.device_id.as_str())
        .collect();

    MetricsSummary {
        record_count: records.len(),
        device_count: devices.len(),
        anomalous_records: records
            .iter()
            .filter(|record| is_anomaly(record))
            .count(),
        temperature: summarize_measurements(
            MeasurementKind::Temperature,
            records.iter().map(|record| &record.temperature),
        ),
        vibration: summarize_measurements(
            MeasurementKind::Vibration,
            records.iter().map(|record| &record.vibration),
        ),
        latest_timestamp: records.iter().map(|record| record.timestamp.clone()).max(),
    }
}

fn summarize_measurements<'a>(
    kind: MeasurementKind,
    measurements: impl Iterator<Item = &'a Measurement>,
) -> MeasurementSummary {
    let mut summary = MeasurementSummary {
        threshold: kind.warning_threshold(),
        ..MeasurementSummary::default()
    };
    let mut total = 0.0;
    let mut count = 0usize;

    for measurement in measurements {
        match measurement.status {
            MeasurementStatus::Normal => summary.normal += 1,
            MeasurementStatus::Warning => summary.warning += 1,
            MeasurementStatus::Critical => summary.critical += 1,
        }
        total += measurement.value;
        count += 1;
        summary.max = Some(match summary.max {
            Some(current) => current.max(measurement.value),
            None => measurement.value,
        });
    }

    if count > 0 {
        summary.average = Some(total / count as f64);
    }
    summary
}

/// Most recent record per device, ordered by device id. Timestamps are
/// ISO-8601 strings, so lexical order is chronological.
pub fn latest_per_device(records: Vec<SensorRecord>) -> Vec<SensorRecord> {
    let mut latest: BTreeMap<String, SensorRecord> = BTreeMap::new();
    for record in records {
        match latest.get(&record.device_id) {
            Some(existing) if existing.timestamp >= record.timestamp => {}
            _ => {
                latest.insert(record.device_id.clone(), record);
            }
        }
    }
    latest.into_values().collect()
}
