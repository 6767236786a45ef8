use crate::contract::SensorRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    SensorRecords,
}

impl DatasetKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::SensorRecords => "sensor_records",
        }
    }
}

/// Replaces characters that would split or confuse a Hive-style path segment.
pub fn sanitize_segment(value: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|character| match character {
            '/' | '\\' | ':' | '=' | ' ' => '-',
            other => other,
        })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

pub fn partition_prefix(
    base_prefix: &str,
    dataset: DatasetKind,
    date: &str,
    device_id: &str,
) -> String {
    let trimmed = base_prefix.trim_matches('/');
    let partitions = format!(
        "dataset={}/date={}/device_id={}",
        dataset.as_str(),
        sanitize_segment(date),
        sanitize_segment(device_id),
    );
    if trimmed.is_empty() {
        partitions
    } else {
        format!("{trimmed}/{partitions}")
    }
}

pub fn sensor_record_object_key(base_prefix: &str, record: &SensorRecord) -> String {
    let date = record.timestamp.get(..10).unwrap_or(&record.timestamp);
    format!(
        "{}/{}.parquet",
        partition_prefix(base_prefix, DatasetKind::SensorRecords, date, &record.device_id),
        sanitize_segment(&record.timestamp),
    )
}

/// The topic rule writes objects as `<topic>/<timestamp>.json`, so the
/// device id is the parent directory of the object.
pub fn device_id_from_object_key(key: &str) -> String {
    let mut segments = key.trim_matches('/').rsplit('/');
    let file_name = segments.next().unwrap_or_default();
    if let Some(parent) = segments.next().filter(|segment| !segment.is_empty()) {
        return parent.to_string();
    }
    let stem = file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name);
    sanitize_segment(stem)
}
