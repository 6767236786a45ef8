use chrono::{DateTime, Utc};
use sensor_pipeline_core::alerting::is_anomaly;
use sensor_pipeline_core::contract::{RawReading, SensorRecord};
use sensor_pipeline_core::storage_keys::sensor_record_object_key;
use sensor_pipeline_core::thresholds::process_reading;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::notifier::Notifier;
use crate::adapters::object_store::ObjectStore;
use crate::adapters::record_table::RecordTable;
use crate::archive::serialize_sensor_records_parquet;
use crate::config::PreprocessorConfig;
use crate::error::HandlerError;
use crate::events::{
    decode_preprocessor_event, decode_raw_reading_bytes, object_location, PreprocessorEvent,
};
use crate::handlers::{publish_record, put_record, InvocationSummary};

pub const COMPLETED_MESSAGE: &str = "Processing completed successfully";
pub const ANOMALY_MESSAGE_TYPE: &str = "anomaly";

pub struct PreprocessorServices<'a, T, N, S> {
    pub table: &'a T,
    pub notifier: &'a N,
    pub objects: &'a S,
}

/// Classifies each reading, stores it, archives it when a processed bucket
/// is configured, and publishes anomalies. Records run in order; the first
/// failure aborts the rest of the batch.
pub fn handle_preprocessor_event<T, N, S>(
    event: Value,
    config: &PreprocessorConfig,
    services: &PreprocessorServices<'_, T, N, S>,
    now: impl Fn() -> DateTime<Utc>,
) -> Result<InvocationSummary, HandlerError>
where
    T: RecordTable,
    N: Notifier,
    S: ObjectStore,
{
    let result = process_event(event, config, services, &now);
    if let Err(failure) = &result {
        error!(component = "preprocessor", error = %failure, "batch_failed");
    }
    result
}

fn process_event<T, N, S>(
    event: Value,
    config: &PreprocessorConfig,
    services: &PreprocessorServices<'_, T, N, S>,
    now: &impl Fn() -> DateTime<Utc>,
) -> Result<InvocationSummary, HandlerError>
where
    T: RecordTable,
    N: Notifier,
    S: ObjectStore,
{
    let mut processed = 0usize;
    let mut published = 0usize;

    match decode_preprocessor_event(event)? {
        PreprocessorEvent::ObjectCreated(notification) => {
            for record in &notification.records {
                let location = object_location(record)?;
                let body = services
                    .objects
                    .read_object(&location.bucket, &location.key)
                    .map_err(HandlerError::dependency("s3"))?;
                let reading = decode_raw_reading_bytes(&body)?;
                info!(
                    component = "preprocessor",
                    bucket = %location.bucket,
                    key = %location.key,
                    "raw_object_loaded"
                );
                if process_reading_record(&reading, config, services, now())? {
                    published += 1;
                }
                processed += 1;
            }
        }
        PreprocessorEvent::Direct(reading) => {
            if process_reading_record(&reading, config, services, now())? {
                published += 1;
            }
            processed += 1;
        }
    }

    info!(
        component = "preprocessor",
        records_processed = processed,
        anomalies_published = published,
        "batch_completed"
    );
    Ok(InvocationSummary::completed(
        COMPLETED_MESSAGE,
        processed,
        published,
    ))
}

/// Returns whether an anomaly notification went out.
fn process_reading_record<T, N, S>(
    reading: &RawReading,
    config: &PreprocessorConfig,
    services: &PreprocessorServices<'_, T, N, S>,
    now: DateTime<Utc>,
) -> Result<bool, HandlerError>
where
    T: RecordTable,
    N: Notifier,
    S: ObjectStore,
{
    let record = process_reading(reading, now, config.retention_days)?;
    put_record(services.table, &record, "sensor record")?;
    info!(
        component = "preprocessor",
        device_id = %record.device_id,
        timestamp = %record.timestamp,
        temperature_status = record.temperature.status.as_str(),
        vibration_status = record.vibration.status.as_str(),
        "sensor_record_stored"
    );

    if let Some(bucket) = &config.processed_bucket {
        archive_record(services.objects, bucket, &config.processed_prefix, &record)?;
    }

    if !is_anomaly(&record) {
        return Ok(false);
    }

    publish_record(
        services.notifier,
        &config.anomaly_topic_arn,
        ANOMALY_MESSAGE_TYPE,
        format!("Sensor anomaly detected on {}", record.device_id),
        &record,
    )?;
    warn!(
        component = "preprocessor",
        device_id = %record.device_id,
        timestamp = %record.timestamp,
        "anomaly_published"
    );
    Ok(true)
}

fn archive_record(
    objects: &impl ObjectStore,
    bucket: &str,
    prefix: &str,
    record: &SensorRecord,
) -> Result<(), HandlerError> {
    let key = sensor_record_object_key(prefix, record);
    let body = serialize_sensor_records_parquet(std::slice::from_ref(record)).map_err(|message| {
        HandlerError::Serialization {
            what: "sensor archive",
            message,
        }
    })?;
    objects
        .write_object(bucket, &key, &body)
        .map_err(HandlerError::dependency("s3"))?;
    info!(component = "preprocessor", bucket, key = %key, "sensor_record_archived");
    Ok(())
}
