//! Parquet encoding for the processed-record archive.

use std::sync::Arc;

use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use sensor_pipeline_core::contract::SensorRecord;

fn sensor_record_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("device_id", DataType::Utf8, false),
        Field::new("timestamp", DataType::Utf8, false),
        Field::new("temperature_value", DataType::Float64, false),
        Field::new("temperature_status", DataType::Utf8, false),
        Field::new("temperature_threshold", DataType::Float64, false),
        Field::new("vibration_value", DataType::Float64, false),
        Field::new("vibration_status", DataType::Utf8, false),
        Field::new("vibration_threshold", DataType::Float64, false),
        Field::new("processed", DataType::Boolean, false),
        Field::new("processed_at", DataType::Utf8, false),
        Field::new("ttl", DataType::Int64, true),
    ]))
}

pub fn serialize_sensor_records_parquet(records: &[SensorRecord]) -> Result<Vec<u8>, String> {
    if records.is_empty() {
        return Err("Sensor archive batch cannot be empty".to_string());
    }

    let schema = sensor_record_schema();
    let column = |extract: fn(&SensorRecord) -> String| -> ArrayRef {
        Arc::new(StringArray::from(
            records.iter().map(extract).collect::<Vec<_>>(),
        ))
    };
    let number = |extract: fn(&SensorRecord) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(
            records.iter().map(extract).collect::<Vec<_>>(),
        ))
    };

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            column(|record| record.device_id.clone()),
            column(|record| record.timestamp.clone()),
            number(|record| record.temperature.value),
            column(|record| record.temperature.status.as_str().to_string()),
            number(|record| record.temperature.threshold),
            number(|record| record.vibration.value),
            column(|record| record.vibration.status.as_str().to_string()),
            number(|record| record.vibration.threshold),
            Arc::new(BooleanArray::from(
                records
                    .iter()
                    .map(|record| record.processed)
                    .collect::<Vec<_>>(),
            )),
            column(|record| record.processed_at.clone()),
            Arc::new(Int64Array::from(
                records.iter().map(|record| record.ttl).collect::<Vec<_>>(),
            )),
        ],
    )
    .map_err(|error| format!("Failed to build sensor archive record batch: {error}"))?;

    let props = WriterProperties::builder().build();
    let mut writer = ArrowWriter::try_new(Vec::new(), schema, Some(props))
        .map_err(|error| format!("Failed to create sensor archive writer: {error}"))?;
    writer
        .write(&batch)
        .map_err(|error| format!("Failed to write sensor archive batch: {error}"))?;
    writer
        .into_inner()
        .map_err(|error| format!("Failed to close sensor archive writer: {error}"))
}
