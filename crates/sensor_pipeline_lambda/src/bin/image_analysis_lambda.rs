use chrono::Utc;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use sensor_pipeline_lambda::adapters::label_detector::RekognitionLabelDetector;
use sensor_pipeline_lambda::adapters::notifier::SnsNotifier;
use sensor_pipeline_lambda::adapters::record_table::DynamoDbRecordTable;
use sensor_pipeline_lambda::config::ImageAnalysisConfig;
use sensor_pipeline_lambda::handlers::image_analysis::handle_image_analysis_event;
use sensor_pipeline_lambda::handlers::InvocationSummary;
use sensor_pipeline_lambda::logging::init_tracing;
use serde_json::Value;

struct Deps {
    config: ImageAnalysisConfig,
    detector: RekognitionLabelDetector,
    table: DynamoDbRecordTable,
    notifier: SnsNotifier,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &Deps,
) -> Result<InvocationSummary, Error> {
    Ok(handle_image_analysis_event(
        event.payload,
        &deps.config,
        &deps.detector,
        &deps.table,
        &deps.notifier,
        Utc::now,
    )?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing("image_analysis");
    let config = ImageAnalysisConfig::from_env()?;
    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;

    let deps = Deps {
        detector: RekognitionLabelDetector::new(aws_sdk_rekognition::Client::new(&aws)),
        table: DynamoDbRecordTable::new(
            config.table_name.clone(),
            aws_sdk_dynamodb::Client::new(&aws),
        ),
        notifier: SnsNotifier::new(aws_sdk_sns::Client::new(&aws)),
        config,
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
        handle_request(event, deps).await
    }))
    .await
}
