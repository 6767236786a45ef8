use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adapters::notifier::{Notification, Notifier};
use crate::adapters::record_table::RecordTable;
use crate::error::HandlerError;

pub mod alert;
pub mod api;
pub mod image_analysis;
pub mod ml;
pub mod preprocessor;

#[cfg(test)]
pub(crate) mod test_support;

/// What an ingestion handler reports back to the runtime once every record
/// in the batch has been handled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InvocationSummary {
    pub status_code: u16,
    pub body: String,
    pub records_processed: usize,
    pub notifications_published: usize,
}

impl InvocationSummary {
    pub fn completed(
        message: &str,
        records_processed: usize,
        notifications_published: usize,
    ) -> Self {
        Self {
            status_code: 200,
            body: Value::String(message.to_string()).to_string(),
            records_processed,
            notifications_published,
        }
    }
}

pub(crate) fn put_record(
    table: &impl RecordTable,
    record: &impl Serialize,
    what: &'static str,
) -> Result<(), HandlerError> {
    let value = serde_json::to_value(record).map_err(HandlerError::serialization(what))?;
    let Value::Object(item) = value else {
        return Err(HandlerError::Serialization {
            what,
            message: "record must serialize to a JSON object".to_string(),
        });
    };
    table
        .put_item(&item)
        .map_err(HandlerError::dependency("dynamodb"))
}

/// SNS rejects subjects over 100 characters or containing line breaks.
const MAX_SUBJECT_CHARS: usize = 99;

/// Subjects embed device ids and alert types straight from the payload.
pub(crate) fn notification_subject(raw: &str) -> String {
    let single_line: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    single_line
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(MAX_SUBJECT_CHARS)
        .collect()
}

pub(crate) fn publish_record(
    notifier: &impl Notifier,
    topic_arn: &str,
    message_type: &str,
    subject: String,
    record: &impl Serialize,
) -> Result<(), HandlerError> {
    let message =
        serde_json::to_string(record).map_err(HandlerError::serialization("notification"))?;
    notifier
        .publish(&Notification {
            topic_arn: topic_arn.to_string(),
            subject: Some(notification_subject(&subject)),
            message,
            message_type: message_type.to_string(),
        })
        .map_err(HandlerError::dependency("sns"))
}
