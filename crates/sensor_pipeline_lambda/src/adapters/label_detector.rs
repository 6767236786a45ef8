use aws_sdk_rekognition::types::{Image, S3Object};
use sensor_pipeline_core::contract::DetectedLabel;

use super::block_on;
use crate::events::ObjectLocation;

pub const MAX_LABELS: i32 = 10;
pub const MIN_CONFIDENCE: f32 = 70.0;

pub trait LabelDetector {
    fn detect_labels(&self, location: &ObjectLocation) -> Result<Vec<DetectedLabel>, String>;
}

pub struct RekognitionLabelDetector {
    client: aws_sdk_rekognition::Client,
}

impl RekognitionLabelDetector {
    pub fn new(client: aws_sdk_rekognition::Client) -> Self {
        Self { client }
    }
}

impl LabelDetector for RekognitionLabelDetector {
    fn detect_labels(&self, location: &ObjectLocation) -> Result<Vec<DetectedLabel>, String> {
        let image = Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&location.bucket)
                    .name(&location.key)
                    .build(),
            )
            .build();
        let request = self
            .client
            .detect_labels()
            .image(image)
            .max_labels(MAX_LABELS)
            .min_confidence(MIN_CONFIDENCE);

        block_on(async move {
            let output = request
                .send()
                .await
                .map_err(|error| format!("failed to detect labels: {error}"))?;
            Ok(output
                .labels()
                .iter()
                .filter_map(|label| {
                    Some(DetectedLabel {
                        name: label.name()?.to_string(),
                        confidence: f64::from(label.confidence().unwrap_or_default()),
                    })
                })
                .collect())
        })
    }
}
