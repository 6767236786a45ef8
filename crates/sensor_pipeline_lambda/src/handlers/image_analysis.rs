use chrono::{DateTime, Utc};
use sensor_pipeline_core::alerting::{has_defects, max_confidence};
use sensor_pipeline_core::contract::{
    format_timestamp, record_ttl, ImageAnalysisRecord, RecordType, QUALITY_CONTROL_ANALYSIS,
};
use sensor_pipeline_core::storage_keys::device_id_from_object_key;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::adapters::label_detector::LabelDetector;
use crate::adapters::notifier::Notifier;
use crate::adapters::record_table::RecordTable;
use crate::config::ImageAnalysisConfig;
use crate::error::HandlerError;
use crate::events::{decode_s3_event, object_location, ObjectLocation};
use crate::handlers::{publish_record, put_record, InvocationSummary};

pub const COMPLETED_MESSAGE: &str = "Image analysis completed";
pub const DEFECT_MESSAGE_TYPE: &str = "defect";

pub fn handle_image_analysis_event(
    event: Value,
    config: &ImageAnalysisConfig,
    detector: &impl LabelDetector,
    table: &impl RecordTable,
    notifier: &impl Notifier,
    now: impl Fn() -> DateTime<Utc>,
) -> Result<InvocationSummary, HandlerError> {
    let notification = decode_s3_event(event).inspect_err(|failure| {
        error!(component = "image_analysis", error = %failure, "batch_failed");
    })?;

    let mut processed = 0usize;
    let mut published = 0usize;
    for record in &notification.records {
        let outcome = object_location(record).and_then(|location| {
            analyze_image(&location, config, detector, table, notifier, now())
        });
        match outcome {
            Ok(defect_published) => {
                processed += 1;
                if defect_published {
                    published += 1;
                }
            }
            Err(failure) => {
                error!(
                    component = "image_analysis",
                    records_processed = processed,
                    error = %failure,
                    "batch_failed"
                );
                return Err(failure);
            }
        }
    }

    info!(
        component = "image_analysis",
        records_processed = processed,
        defects_published = published,
        "batch_completed"
    );
    Ok(InvocationSummary::completed(
        COMPLETED_MESSAGE,
        processed,
        published,
    ))
}

fn analyze_image(
    location: &ObjectLocation,
    config: &ImageAnalysisConfig,
    detector: &impl LabelDetector,
    table: &impl RecordTable,
    notifier: &impl Notifier,
    now: DateTime<Utc>,
) -> Result<bool, HandlerError> {
    let labels = detector
        .detect_labels(location)
        .map_err(HandlerError::dependency("rekognition"))?;

    let analysis = ImageAnalysisRecord {
        device_id: device_id_from_object_key(&location.key),
        timestamp: format_timestamp(now),
        record_type: RecordType::Analysis,
        image_key: location.key.clone(),
        bucket: location.bucket.clone(),
        confidence: max_confidence(&labels),
        analysis_type: QUALITY_CONTROL_ANALYSIS.to_string(),
        defect_detected: has_defects(&labels),
        labels,
        ttl: record_ttl(now, config.retention_days),
    };

    put_record(table, &analysis, "image analysis")?;
    info!(
        component = "image_analysis",
        device_id = %analysis.device_id,
        key = %analysis.image_key,
        labels = analysis.labels.len(),
        defect_detected = analysis.defect_detected,
        "analysis_stored"
    );

    if !analysis.defect_detected {
        return Ok(false);
    }

    publish_record(
        notifier,
        &config.alert_topic_arn,
        DEFECT_MESSAGE_TYPE,
        format!("Quality defect detected on {}", analysis.device_id),
        &analysis,
    )?;
    warn!(
        component = "image_analysis",
        device_id = %analysis.device_id,
        key = %analysis.image_key,
        "defect_published"
    );
    Ok(true)
}
