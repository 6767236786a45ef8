use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use sensor_pipeline_core::contract::DetectedLabel;
use serde_json::{json, Map, Value};

use crate::adapters::inference::InferenceEndpoint;
use crate::adapters::label_detector::LabelDetector;
use crate::adapters::notifier::{Notification, Notifier};
use crate::adapters::object_store::ObjectStore;
use crate::adapters::record_table::{RecordTable, TableQuery};
use crate::events::ObjectLocation;

pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 14, 10, 30, 0)
        .single()
        .expect("valid fixed time")
}

/// An `ObjectCreated:Put` notification shaped like the ones S3 delivers,
/// one record per key.
pub fn s3_notification(bucket: &str, keys: &[&str]) -> Value {
    let records: Vec<Value> = keys
        .iter()
        .enumerate()
        .map(|(index, key)| {
            json!({
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "eu-west-1",
                "eventTime": "2026-02-14T10:29:58.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": {"principalId": "AWS:AIDAEXAMPLE"},
                "requestParameters": {"sourceIPAddress": "10.0.0.12"},
                "responseElements": {
                    "x-amz-request-id": "C3D13FE58DE4C810",
                    "x-amz-id-2": "FMyUVURIY8/IgAtTv8xRjskZQpcIZ9KG4V5Wp6S7S/JRWeUWerMUE5JgHvANOjpD"
                },
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "sensor-pipeline",
                    "bucket": {
                        "name": bucket,
                        "ownerIdentity": {"principalId": "A3NL1KOZZKExample"},
                        "arn": format!("arn:aws:s3:::{bucket}")
                    },
                    "object": {
                        "key": key,
                        "size": 512,
                        "eTag": "d41d8cd98f00b204e9800998ecf8427e",
                        "sequencer": format!("0055AED6DCD90281E{index}")
                    }
                }
            })
        })
        .collect();
    json!({ "Records": records })
}

/// Records every put; fails once `fail_after` puts have succeeded.
pub struct RecordingTable {
    items: Mutex<Vec<Map<String, Value>>>,
    queries: Mutex<Vec<TableQuery>>,
    query_results: Vec<Value>,
    fail_after: Option<usize>,
}

impl RecordingTable {
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            query_results: Vec::new(),
            fail_after: None,
        }
    }

    /// Every put and query fails.
    pub fn failing() -> Self {
        Self::failing_after(0)
    }

    pub fn failing_after(puts: usize) -> Self {
        Self {
            fail_after: Some(puts),
            ..Self::new()
        }
    }

    /// Queries answer with the matching subset of `results`, in order.
    pub fn with_query_results(results: Vec<Value>) -> Self {
        Self {
            query_results: results,
            ..Self::new()
        }
    }

    pub fn items(&self) -> Vec<Map<String, Value>> {
        self.items.lock().expect("poisoned mutex").clone()
    }

    pub fn queries(&self) -> Vec<TableQuery> {
        self.queries.lock().expect("poisoned mutex").clone()
    }
}

impl RecordTable for RecordingTable {
    fn put_item(&self, item: &Map<String, Value>) -> Result<(), String> {
        let mut items = self.items.lock().expect("poisoned mutex");
        if self.fail_after.is_some_and(|limit| items.len() >= limit) {
            return Err("ProvisionedThroughputExceededException".to_string());
        }
        items.push(item.clone());
        Ok(())
    }

    fn query(&self, query: &TableQuery) -> Result<Vec<Value>, String> {
        self.queries
            .lock()
            .expect("poisoned mutex")
            .push(query.clone());
        if self.fail_after == Some(0) {
            return Err("ResourceNotFoundException: table missing".to_string());
        }
        Ok(self
            .query_results
            .iter()
            .filter(|item| matches_query(item, query))
            .take(query.limit)
            .cloned()
            .collect())
    }
}

/// Same selection the table applies through its key and filter expressions.
fn matches_query(item: &Value, query: &TableQuery) -> bool {
    let field = |name: &str| item.get(name).and_then(Value::as_str);
    field("recordType") == Some(query.record_type.as_str())
        && query
            .device_id
            .as_deref()
            .is_none_or(|device_id| field("deviceId") == Some(device_id))
        && query
            .severity
            .is_none_or(|severity| field("severity") == Some(severity.as_str()))
}

pub struct RecordingNotifier {
    published: Mutex<Vec<Notification>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn published(&self) -> Vec<Notification> {
        self.published.lock().expect("poisoned mutex").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, notification: &Notification) -> Result<(), String> {
        if self.fail {
            return Err("AuthorizationErrorException".to_string());
        }
        self.published
            .lock()
            .expect("poisoned mutex")
            .push(notification.clone());
        Ok(())
    }
}

pub struct MemoryObjectStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    pub fn seed_object(&self, bucket: &str, key: &str, body: &[u8]) {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
    }

    pub fn body(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .expect("poisoned mutex")
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys_in(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .expect("poisoned mutex")
            .keys()
            .filter(|(object_bucket, _)| object_bucket == bucket)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl ObjectStore for MemoryObjectStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        self.body(bucket, key)
            .ok_or_else(|| format!("NoSuchKey: s3://{bucket}/{key}"))
    }

    fn write_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        self.seed_object(bucket, key, body);
        Ok(())
    }
}

/// Answers every image with the labels registered for its key.
pub struct StaticLabelDetector {
    labels: HashMap<String, Vec<DetectedLabel>>,
    calls: Mutex<Vec<ObjectLocation>>,
}

impl StaticLabelDetector {
    pub fn new(labels: &[(&str, Vec<DetectedLabel>)]) -> Self {
        Self {
            labels: labels
                .iter()
                .map(|(key, labels)| (key.to_string(), labels.clone()))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<ObjectLocation> {
        self.calls.lock().expect("poisoned mutex").clone()
    }
}

impl LabelDetector for StaticLabelDetector {
    fn detect_labels(&self, location: &ObjectLocation) -> Result<Vec<DetectedLabel>, String> {
        self.calls
            .lock()
            .expect("poisoned mutex")
            .push(location.clone());
        self.labels
            .get(&location.key)
            .cloned()
            .ok_or_else(|| format!("InvalidS3ObjectException: {}", location.key))
    }
}

pub fn label(name: &str, confidence: f64) -> DetectedLabel {
    DetectedLabel {
        name: name.to_string(),
        confidence,
    }
}

/// Replies with a fixed prediction and records every payload it receives.
pub struct StaticEndpoint {
    response: Result<Value, String>,
    payloads: Mutex<Vec<(String, Value)>>,
}

impl StaticEndpoint {
    pub fn new(response: Value) -> Self {
        Self {
            response: Ok(response),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            payloads: Mutex::new(Vec::new()),
        }
    }

    pub fn payloads(&self) -> Vec<(String, Value)> {
        self.payloads.lock().expect("poisoned mutex").clone()
    }
}

impl InferenceEndpoint for StaticEndpoint {
    fn invoke(&self, endpoint_name: &str, payload: &Value) -> Result<Value, String> {
        self.payloads
            .lock()
            .expect("poisoned mutex")
            .push((endpoint_name.to_string(), payload.clone()));
        self.response.clone()
    }
}
