use aws_sdk_sns::types::MessageAttributeValue;

use super::block_on;

/// Message attribute subscribers filter on.
pub const TYPE_ATTRIBUTE: &str = "type";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub topic_arn: String,
    pub subject: Option<String>,
    pub message: String,
    pub message_type: String,
}

pub trait Notifier {
    fn publish(&self, notification: &Notification) -> Result<(), String>;
}

pub struct SnsNotifier {
    client: aws_sdk_sns::Client,
}

impl SnsNotifier {
    pub fn new(client: aws_sdk_sns::Client) -> Self {
        Self { client }
    }
}

impl Notifier for SnsNotifier {
    fn publish(&self, notification: &Notification) -> Result<(), String> {
        let type_attribute = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(&notification.message_type)
            .build()
            .map_err(|error| format!("failed to build sns message attribute: {error}"))?;

        let request = self
            .client
            .publish()
            .topic_arn(&notification.topic_arn)
            .message(&notification.message)
            .set_subject(notification.subject.clone())
            .message_attributes(TYPE_ATTRIBUTE, type_attribute);

        block_on(async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to publish sns notification: {error}"))
        })
    }
}
