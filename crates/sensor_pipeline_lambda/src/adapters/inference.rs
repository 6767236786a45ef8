use aws_sdk_sagemakerruntime::primitives::Blob;
use serde_json::Value;

use super::block_on;

pub const JSON_CONTENT_TYPE: &str = "application/json";

pub trait InferenceEndpoint {
    fn invoke(&self, endpoint_name: &str, payload: &Value) -> Result<Value, String>;
}

pub struct SageMakerEndpoint {
    client: aws_sdk_sagemakerruntime::Client,
}

impl SageMakerEndpoint {
    pub fn new(client: aws_sdk_sagemakerruntime::Client) -> Self {
        Self { client }
    }
}

impl InferenceEndpoint for SageMakerEndpoint {
    fn invoke(&self, endpoint_name: &str, payload: &Value) -> Result<Value, String> {
        let body = serde_json::to_vec(payload)
            .map_err(|error| format!("failed to encode inference payload: {error}"))?;
        let request = self
            .client
            .invoke_endpoint()
            .endpoint_name(endpoint_name)
            .content_type(JSON_CONTENT_TYPE)
            .accept(JSON_CONTENT_TYPE)
            .body(Blob::new(body));

        block_on(async move {
            let output = request
                .send()
                .await
                .map_err(|error| format!("failed to invoke sagemaker endpoint: {error}"))?;
            let bytes: &[u8] = output.body().map(|blob| blob.as_ref()).unwrap_or_default();
            serde_json::from_slice(bytes)
                .map_err(|error| format!("inference response is not valid JSON: {error}"))
        })
    }
}
