use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use sensor_pipeline_lambda::adapters::notifier::SnsNotifier;
use sensor_pipeline_lambda::adapters::object_store::S3ObjectStore;
use sensor_pipeline_lambda::adapters::record_table::DynamoDbRecordTable;
use sensor_pipeline_lambda::config::PreprocessorConfig;
use sensor_pipeline_lambda::handlers::preprocessor::{
    handle_preprocessor_event, PreprocessorServices,
};
use sensor_pipeline_lambda::handlers::InvocationSummary;
use sensor_pipeline_lambda::logging::init_tracing;
use serde_json::Value;

struct Deps {
    config: PreprocessorConfig,
    table: DynamoDbRecordTable,
    notifier: SnsNotifier,
    objects: S3ObjectStore,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &Deps,
) -> Result<InvocationSummary, Error> {
    let services = PreprocessorServices {
        table: &deps.table,
        notifier: &deps.notifier,
        objects: &deps.objects,
    };
    Ok(handle_preprocessor_event(
        event.payload,
        &deps.config,
        &services,
        Utc::now,
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing("preprocessor");
    let config = PreprocessorConfig::from_env()?;
    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let deps = Deps {
        table: DynamoDbRecordTable::new(
            config.table_name.clone(),
            aws_sdk_dynamodb::Client::new(&aws),
        ),
        notifier: SnsNotifier::new(aws_sdk_sns::Client::new(&aws)),
        objects: S3ObjectStore::new(aws_sdk_s3::Client::new(&aws)),
        config,
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps).await
    }))
    .await
}
