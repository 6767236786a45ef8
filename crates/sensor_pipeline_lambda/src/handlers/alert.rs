use chrono::{DateTime, Utc};
use sensor_pipeline_core::alerting::process_alert;
use sensor_pipeline_core::contract::AlertRecord;
use serde_json::Value;
use tracing::{error, info};

use crate::adapters::notifier::Notifier;
use crate::adapters::record_table::RecordTable;
use crate::config::AlertConfig;
use crate::error::HandlerError;
use crate::events::decode_alert_event;
use crate::handlers::{publish_record, put_record, InvocationSummary};

pub const COMPLETED_MESSAGE: &str = "Alert processed successfully";
pub const ALERT_MESSAGE_TYPE: &str = "alert";

pub fn handle_alert_event(
    event: Value,
    config: &AlertConfig,
    table: &impl RecordTable,
    notifier: &impl Notifier,
    now: impl Fn() -> DateTime<Utc>,
) -> Result<InvocationSummary, HandlerError> {
    let result = process_event(event, config, table, notifier, now());
    match &result {
        Ok(alert) => info!(
            component = "alert",
            alert_id = %alert.alert_id,
            device_id = %alert.device_id,
            severity = alert.severity.as_str(),
            "alert_published"
        ),
        Err(failure) => error!(component = "alert", error = %failure, "alert_failed"),
    }
    result.map(|_| InvocationSummary::completed(COMPLETED_MESSAGE, 1, 1))
}

fn process_event(
    event: Value,
    config: &AlertConfig,
    table: &impl RecordTable,
    notifier: &impl Notifier,
    now: DateTime<Utc>,
) -> Result<AlertRecord, HandlerError> {
    let payload = decode_alert_event(event)?;
    let alert = process_alert(&payload, now, config.retention_days)?;

    put_record(table, &alert, "alert")?;
    publish_record(
        notifier,
        &config.alert_topic_arn,
        ALERT_MESSAGE_TYPE,
        alert_subject(&alert),
        &alert,
    )?;
    Ok(alert)
}

fn alert_subject(alert: &AlertRecord) -> String {
    format!(
        "[{}] {} alert for {}",
        alert.severity.as_str().to_ascii_uppercase(),
        alert.alert_type,
        alert.device_id
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::handlers::test_support::{fixed_now, RecordingNotifier, RecordingTable};

    fn sample_config() -> AlertConfig {
        AlertConfig {
            table_name: "devices".to_string(),
            alert_topic_arn: "arn:aws:sns:eu-west-1:123456789012:alerts".to_string(),
            retention_days: None,
        }
    }

    #[test]
    fn stores_and_publishes_critical_alert() {
        let table = RecordingTable::new();
        let notifier = RecordingNotifier::new();

        let summary = handle_alert_event(
            json!({
                "source": "sensor.pipeline",
                "detail": {
                    "deviceId": "press-7",
                    "type": "anomaly",
                    "temperature": {"value": 90, "status": "critical", "threshold": 75},
                    "vibration": {"value": 0.3, "status": "normal", "threshold": 0.5}
                }
            }),
            &sample_config(),
            &table,
            &notifier,
            fixed_now,
        )
        .expect("alert should process");

        assert_eq!(summary.body, "\"Alert processed successfully\"");
        let items = table.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["alertId"], json!("alert_20260214103000"));
        assert_eq!(items[0]["severity"], json!("critical"));
        assert_eq!(items[0]["status"], json!("new"));
        assert_eq!(items[0]["recordType"], json!("alert"));
        assert_eq!(
            items[0]["message"],
            json!("Temperature 90°C exceeds threshold 75°C")
        );

        let published = notifier.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message_type, "alert");
        assert_eq!(
            published[0].subject.as_deref(),
            Some("[CRITICAL] anomaly alert for press-7")
        );
    }

    #[test]
    fn accepts_bare_payload_and_defaults_type() {
        let table = RecordingTable::new();
        let notifier = RecordingNotifier::new();

        handle_alert_event(
            json!({"deviceId": "press-7"}),
            &sample_config(),
            &table,
            &notifier,
            fixed_now,
        )
        .expect("bare payload should process");

        let items = table.items();
        assert_eq!(items[0]["type"], json!("unknown"));
        assert_eq!(items[0]["severity"], json!("info"));
        assert_eq!(items[0]["message"], json!("No specific issues detected"));
    }

    #[test]
    fn combines_warning_messages_in_fixed_order() {
        let table = RecordingTable::new();
        let notifier = RecordingNotifier::new();

        handle_alert_event(
            json!({"detail": {
                "deviceId": "press-7",
                "vibration": {"value": 0.9, "status": "critical", "threshold": 0.5},
                "temperature": {"value": 80, "status": "warning", "threshold": 75}
            }}),
            &sample_config(),
            &table,
            &notifier,
            fixed_now,
        )
        .expect("alert should process");

        assert_eq!(
            table.items()[0]["message"],
            json!("Temperature 80°C exceeds threshold 75°C and Vibration 0.9g exceeds threshold 0.5g")
        );
    }

    #[test]
    fn missing_device_id_is_malformed_and_nothing_is_written() {
        let table = RecordingTable::new();
        let notifier = RecordingNotifier::new();

        let error = handle_alert_event(
            json!({"detail": {"type": "anomaly"}}),
            &sample_config(),
            &table,
            &notifier,
            fixed_now,
        )
        .expect_err("alert without device should fail");

        assert!(error.is_malformed());
        assert!(table.items().is_empty());
        assert!(notifier.published().is_empty());
    }

    #[test]
    fn multiline_alert_type_yields_single_line_subject() {
        let table = RecordingTable::new();
        let notifier = RecordingNotifier::new();

        handle_alert_event(
            json!({"detail": {"deviceId": "press-7", "type": "over\nheat\r\nBcc: ops"}}),
            &sample_config(),
            &table,
            &notifier,
            fixed_now,
        )
        .expect("alert should process");

        let published = notifier.published();
        assert_eq!(
            published[0].subject.as_deref(),
            Some("[INFO] over heat Bcc: ops alert for press-7")
        );
        assert_eq!(table.items()[0]["type"], json!("over\nheat\r\nBcc: ops"));
    }

    #[test]
    fn notifier_failure_fails_after_store() {
        let table = RecordingTable::new();
        let notifier = RecordingNotifier::failing();

        let error = handle_alert_event(
            json!({"detail": {"deviceId": "press-7"}}),
            &sample_config(),
            &table,
            &notifier,
            fixed_now,
        )
        .expect_err("sns failure should fail the invocation");

        assert!(matches!(
            error,
            HandlerError::Dependency { service: "sns", .. }
        ));
        assert_eq!(table.items().len(), 1);
    }
}
