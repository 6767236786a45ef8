use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use sensor_pipeline_core::contract::{RecordType, Severity};
use serde_json::{Map, Number, Value};

use super::block_on;

pub const RECORD_TYPE_INDEX: &str = "record-type-index";

/// Read-only queries the API exposes. Results come back newest first and
/// `limit` counts matching items, not items read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    pub record_type: RecordType,
    pub device_id: Option<String>,
    pub severity: Option<Severity>,
    pub limit: usize,
}

impl TableQuery {
    pub fn of_type(record_type: RecordType, limit: usize) -> Self {
        Self {
            record_type,
            device_id: None,
            severity: None,
            limit,
        }
    }

    pub fn for_device(mut self, device_id: Option<&str>) -> Self {
        self.device_id = device_id.map(str::to_string);
        self
    }

    pub fn with_severity(mut self, severity: Option<Severity>) -> Self {
        self.severity = severity;
        self
    }
}

/// Expression parts of one DynamoDB `Query`, shared by every page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParts {
    pub index_name: Option<&'static str>,
    pub key_condition: &'static str,
    pub filter_expression: Option<String>,
    pub values: Vec<(&'static str, String)>,
    /// Only set when nothing is filtered; DynamoDB applies `Limit` before
    /// the filter expression.
    pub page_size: Option<i32>,
}

/// Device queries read the device partition of the base table, everything
/// else goes through the record type index.
pub fn build_query(query: &TableQuery) -> QueryParts {
    let record_type = (":record_type", query.record_type.as_str().to_string());
    let mut filters = Vec::new();
    let mut values = Vec::new();

    let (index_name, key_condition) = match &query.device_id {
        Some(device_id) => {
            values.push((":device_id", device_id.clone()));
            filters.push("recordType = :record_type");
            values.push(record_type);
            (None, "deviceId = :device_id")
        }
        None => {
            values.push(record_type);
            (Some(RECORD_TYPE_INDEX), "recordType = :record_type")
        }
    };
    if let Some(severity) = query.severity {
        filters.push("severity = :severity");
        values.push((":severity", severity.as_str().to_string()));
    }

    let page_size = filters.is_empty().then(|| clamp_limit(query.limit));
    QueryParts {
        index_name,
        key_condition,
        filter_expression: (!filters.is_empty()).then(|| filters.join(" AND ")),
        values,
        page_size,
    }
}

pub trait RecordTable {
    fn put_item(&self, item: &Map<String, Value>) -> Result<(), String>;
    fn query(&self, query: &TableQuery) -> Result<Vec<Value>, String> {
        let parts = build_query(query);

        block_on(async move {
            let mut items = Vec::new();
            let mut start_key = None;
            loop {
                let mut request = self
                    .client
                    .query()
                    .table_name(&self.table_name)
                    .set_index_name(parts.index_name.map(str::to_string))
                    .key_condition_expression(parts.key_condition)
                    .set_filter_expression(parts.filter_expression.clone())
                    .set_limit(parts.page_size)
                    .set_exclusive_start_key(start_key.take())
                    .scan_index_forward(false);
                for (name, value) in &parts.values {
                    request =
                        request.expression_attribute_values(*name, AttributeValue::S(value.clone()));
                }

                let output = request
                    .send()
                    .await
                    .map_err(|error| format!("failed to query dynamodb: {error}"))?;
                items.extend(output.items().iter().map(from_attribute_map));

                match output.last_evaluated_key() {
                    Some(key) if items.len() < query.limit => start_key = Some(key.clone()),
                    _ => break,
                }
            }
            items.truncate(query.limit);
            Ok(items)
        })
    }
}

fn clamp_limit(limit: usize) -> i32 {
    i32::try_from(limit).unwrap_or(i32::MAX).max(1)
}

pub fn to_attribute_map(item: &Map<String, Value>) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(key, value)| (key.clone(), to_attribute(value)))
        .collect()
}

pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(flag) => AttributeValue::Bool(*flag),
        Value::Number(number) => AttributeValue::N(number.to_string()),
        Value::String(text) => AttributeValue::S(text.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(object) => AttributeValue::M(to_attribute_map(object)),
    }
}

pub fn from_attribute_map(item: &HashMap<String, AttributeValue>) -> Value {
    Value::Object(
        item.iter()
            .map(|(key, value)| (key.clone(), from_attribute(value)))
            .collect(),
    )
}

pub fn from_attribute(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(number) => parse_number(number),
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::L(items) => Value::Array(items.iter().map(from_attribute).collect()),
        AttributeValue::M(map) => from_attribute_map(map),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => {
            Value::Array(values.iter().map(|number| parse_number(number)).collect())
        }
        _ => Value::Null,
    }
}

fn parse_number(raw: &str) -> Value {
    if let Ok(integer) = raw.parse::<i64>() {
        return Value::Number(integer.into());
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn converts_nested_json_into_attributes() {
        let item = json!({
            "deviceId": "press-7",
            "processed": true,
            "temperature": {"value": 90.5, "status": "critical", "threshold": 75},
            "labels": [{"name": "Rust", "confidence": 91.0}],
            "ttl": null
        });
        let attributes = to_attribute_map(item.as_object().expect("fixture is an object"));

        assert_eq!(attributes["deviceId"], AttributeValue::S("press-7".to_string()));
        assert_eq!(attributes["processed"], AttributeValue::Bool(true));
        assert_eq!(attributes["ttl"], AttributeValue::Null(true));
        let AttributeValue::M(temperature) = &attributes["temperature"] else {
            panic!("temperature should be a map");
        };
        assert_eq!(temperature["value"], AttributeValue::N("90.5".to_string()));
        assert_eq!(temperature["threshold"], AttributeValue::N("75".to_string()));
        assert!(matches!(&attributes["labels"], AttributeValue::L(items) if items.len() == 1));
    }

    #[test]
    fn attribute_items_convert_back_to_equal_json() {
        let item = json!({
            "deviceId": "press-7",
            "timestamp": "2026-02-14T10:30:00Z",
            "temperature": {"value": 90.5, "status": "critical", "threshold": 75},
            "processed": true
        });
        let attributes = to_attribute_map(item.as_object().expect("fixture is an object"));

        assert_eq!(from_attribute_map(&attributes), item);
    }

    #[test]
    fn string_and_number_sets_become_arrays() {
        let value = from_attribute(&AttributeValue::Ns(vec!["1".to_string(), "2.5".to_string()]));
        assert_eq!(value, json!([1, 2.5]));
        let value = from_attribute(&AttributeValue::Ss(vec!["a".to_string()]));
        assert_eq!(value, json!(["a"]));
    }

    #[test]
    fn type_query_reads_the_record_type_index_in_limit_sized_pages() {
        let parts = build_query(&TableQuery::of_type(RecordType::Sensor, 50));

        assert_eq!(parts.index_name, Some(RECORD_TYPE_INDEX));
        assert_eq!(parts.key_condition, "recordType = :record_type");
        assert_eq!(parts.filter_expression, None);
        assert_eq!(parts.values, vec![(":record_type", "sensor".to_string())]);
        assert_eq!(parts.page_size, Some(50));
    }

    #[test]
    fn device_query_filters_record_type_without_page_limit() {
        let parts = build_query(
            &TableQuery::of_type(RecordType::Analysis, 10).for_device(Some("press-7")),
        );

        assert_eq!(parts.index_name, None);
        assert_eq!(parts.key_condition, "deviceId = :device_id");
        assert_eq!(
            parts.filter_expression.as_deref(),
            Some("recordType = :record_type")
        );
        assert_eq!(
            parts.values,
            vec![
                (":device_id", "press-7".to_string()),
                (":record_type", "analysis".to_string()),
            ]
        );
        assert_eq!(parts.page_size, None);
    }

    #[test]
    fn severity_is_filtered_server_side() {
        let parts = build_query(
            &TableQuery::of_type(RecordType::Alert, 5).with_severity(Some(Severity::Critical)),
        );
        assert_eq!(parts.index_name, Some(RECORD_TYPE_INDEX));
        assert_eq!(parts.filter_expression.as_deref(), Some("severity = :severity"));
        assert!(parts.values.contains(&(":severity", "critical".to_string())));
        assert_eq!(parts.page_size, None);

        let parts = build_query(
            &TableQuery::of_type(RecordType::Alert, 5)
                .for_device(Some("press-7"))
                .with_severity(Some(Severity::Warning)),
        );
        assert_eq!(
            parts.filter_expression.as_deref(),
            Some("recordType = :record_type AND severity = :severity")
        );
        assert_eq!(parts.values.len(), 3);
    }

    #[test]
    fn limits_are_clamped_to_dynamodb_range() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(usize::MAX), i32::MAX);
    }
}
