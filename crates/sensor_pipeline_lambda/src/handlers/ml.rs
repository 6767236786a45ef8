use chrono::{DateTime, Utc};
use sensor_pipeline_core::alerting::{anomaly_score, is_predicted_anomaly};
use sensor_pipeline_core::contract::{format_timestamp, record_ttl, PredictionRecord, RecordType};
use sensor_pipeline_core::inference::InferenceInput;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::inference::InferenceEndpoint;
use crate::adapters::notifier::Notifier;
use crate::adapters::record_table::RecordTable;
use crate::config::MlConfig;
use crate::error::HandlerError;
use crate::events::{decode_sqs_event, message_json_body, SqsMessage};
use crate::handlers::{publish_record, put_record, InvocationSummary};

pub const COMPLETED_MESSAGE: &str = "ML processing completed";
pub const PREDICTION_MESSAGE_TYPE: &str = "prediction";

/// Scores each queued reading. The prediction alert goes out before the
/// prediction is stored, so a table failure after publishing still fails the
/// batch and the message is redelivered.
pub fn handle_ml_event(
    event: Value,
    config: &MlConfig,
    endpoint: &impl InferenceEndpoint,
    table: &impl RecordTable,
    notifier: &impl Notifier,
    now: impl Fn() -> DateTime<Utc>,
) -> Result<InvocationSummary, HandlerError> {
    let queue_event = decode_sqs_event(event).inspect_err(|failure| {
        error!(component = "ml", error = %failure, "batch_failed");
    })?;

    let mut processed = 0usize;
    let mut published = 0usize;
    for message in &queue_event.records {
        match score_message(message, config, endpoint, table, notifier, now()) {
            Ok(alerted) => {
                processed += 1;
                if alerted {
                    published += 1;
                }
            }
            Err(failure) => {
                error!(
                    component = "ml",
                    message_id = message.message_id.as_deref().unwrap_or_default(),
                    records_processed = processed,
                    error = %failure,
                    "batch_failed"
                );
                return Err(failure);
            }
        }
    }

    info!(
        component = "ml",
        records_processed = processed,
        predictions_published = published,
        "batch_completed"
    );
    Ok(InvocationSummary::completed(
        COMPLETED_MESSAGE,
        processed,
        published,
    ))
}

fn score_message(
    message: &SqsMessage,
    config: &MlConfig,
    endpoint: &impl InferenceEndpoint,
    table: &impl RecordTable,
    notifier: &impl Notifier,
    now: DateTime<Utc>,
) -> Result<bool, HandlerError> {
    let input = InferenceInput::from_message(&message_json_body(message)?)?;
    let prediction = endpoint
        .invoke(&config.endpoint_name, &input.endpoint_payload())
        .map_err(HandlerError::dependency("sagemaker"))?;
    let score = anomaly_score(&prediction);

    // Keyed on inference time; reusing the reading's timestamp would
    // overwrite the sensor record under the same key.
    let record = PredictionRecord {
        device_id: input.device_id,
        timestamp: format_timestamp(now),
        record_type: RecordType::Prediction,
        endpoint: config.endpoint_name.clone(),
        prediction,
        anomaly_score: score,
        ttl: record_ttl(now, config.retention_days),
    };

    let alerted = is_predicted_anomaly(score);
    if alerted {
        publish_record(
            notifier,
            &config.alert_topic_arn,
            PREDICTION_MESSAGE_TYPE,
            format!("Predicted anomaly on {}", record.device_id),
            &record,
        )?;
        warn!(
            component = "ml",
            device_id = %record.device_id,
            anomaly_score = score.unwrap_or_default(),
            "prediction_published"
        );
    }

    put_record(table, &record, "prediction")?;
    info!(
        component = "ml",
        device_id = %record.device_id,
        source_timestamp = input.timestamp.as_deref().unwrap_or_default(),
        anomaly_score = ?score,
        "prediction_stored"
    );
    Ok(alerted)
}
