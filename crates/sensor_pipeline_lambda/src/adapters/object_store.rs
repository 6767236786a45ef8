use aws_sdk_s3::primitives::ByteStream;

use super::block_on;

pub trait ObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String>;
    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String>;
}

pub struct S3ObjectStore {
    s3_client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(s3_client: aws_sdk_s3::Client) -> Self {
        Self { s3_client }
    }
}

impl ObjectStore for S3ObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let request = self.s3_client.get_object().bucket(bucket).key(key);

        block_on(async move {
            let output = request
                .send()
                .await
                .map_err(|error| format!("failed to read object from s3: {error}"))?;
            let bytes = output
                .body
                .collect()
                .await
                .map_err(|error| format!("failed to read s3 object body: {error}"))?;
            Ok(bytes.into_bytes().to_vec())
        })
    }

    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        let request = self
            .s3_client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body.to_vec()));

        block_on(async move {
            request
                .send()
                .await
                .map(|_| ())
                .map_err(|error| format!("failed to write object to s3: {error}"))
        })
    }
}
