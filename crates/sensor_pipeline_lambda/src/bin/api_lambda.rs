use lambda_runtime::{service_fn, Error, LambdaEvent};
use sensor_pipeline_lambda::adapters::record_table::DynamoDbRecordTable;
use sensor_pipeline_lambda::config::ApiConfig;
use sensor_pipeline_lambda::handlers::api::{handle_api_event, ApiGatewayResponse};
use sensor_pipeline_lambda::logging::init_tracing;
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    table: &DynamoDbRecordTable,
) -> Result<ApiGatewayResponse, Error> {
    Ok(handle_api_event(event.payload, table))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing("api");
    let config = ApiConfig::from_env()?;
    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let table = DynamoDbRecordTable::new(config.table_name, aws_sdk_dynamodb::Client::new(&aws));
    let table = &table;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, table).await
    }))
    .await
}
