use sensor_pipeline_core::contract::{RecordType, SensorRecord, Severity};
use sensor_pipeline_core::metrics::{latest_per_device, summarize};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::adapters::record_table::{RecordTable, TableQuery};
use crate::error::HandlerError;
use crate::events::{decode_api_request, ApiGatewayRequest};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 500;
pub const NOT_FOUND_MESSAGE: &str = "Not Found";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Index,
    Devices,
    Alerts,
    Analysis,
    Metrics,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Index,
        Route::Devices,
        Route::Alerts,
        Route::Analysis,
        Route::Metrics,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Index => "/",
            Route::Devices => "/devices",
            Route::Alerts => "/alerts",
            Route::Analysis => "/analysis",
            Route::Metrics => "/metrics",
        }
    }

    /// Only `GET` is routed. A trailing slash is ignored.
    pub fn resolve(method: &str, path: &str) -> Option<Self> {
        if !method.eq_ignore_ascii_case("GET") {
            return None;
        }
        let trimmed = path.trim_end_matches('/');
        let normalized = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL
            .into_iter()
            .find(|route| route.path() == normalized)
    }
}

/// Never fails the invocation: bad requests answer 400, unknown routes 404
/// and route faults 500.
pub fn handle_api_event(event: Value, table: &impl RecordTable) -> ApiGatewayResponse {
    let request = match decode_api_request(event) {
        Ok(request) => request,
        Err(failure) => {
            warn!(component = "api", error = %failure, "request_rejected");
            return error_response(400, &failure);
        }
    };

    let route = request
        .path
        .as_deref()
        .and_then(|path| Route::resolve(&request.http_method, path));
    let Some(route) = route else {
        info!(
            component = "api",
            method = %request.http_method,
            path = ?request.path,
            "route_not_found"
        );
        return json_response(404, Value::String(NOT_FOUND_MESSAGE.to_string()));
    };

    match dispatch(route, &request, table) {
        Ok(body) => {
            info!(component = "api", route = route.path(), "request_served");
            json_response(200, body)
        }
        Err(failure) if failure.is_malformed() => {
            warn!(component = "api", route = route.path(), error = %failure, "request_rejected");
            error_response(400, &failure)
        }
        Err(failure) => {
            error!(component = "api", route = route.path(), error = %failure, "route_failed");
            error_response(500, &failure)
        }
    }
}

fn dispatch(
    route: Route,
    request: &ApiGatewayRequest,
    table: &impl RecordTable,
) -> Result<Value, HandlerError> {
    let device_id = request.query_param("deviceId");
    let limit = parse_limit(request.query_param("limit"), DEFAULT_LIMIT);

    match route {
        Route::Index => Ok(json!({
            "routes": Route::ALL
                .iter()
                .map(|route| format!("GET {}", route.path()))
                .collect::<Vec<_>>()
        })),
        Route::Devices => {
            let table_query = TableQuery::of_type(RecordType::Sensor, limit).for_device(device_id);
            let items = query(table, &table_query)?;
            match device_id {
                Some(_) => Ok(Value::Array(items)),
                None => to_body(&latest_per_device(decode_sensor_records(items))),
            }
        }
        Route::Alerts => {
            let severity = match request.query_param("severity") {
                Some(raw) => Some(Severity::parse(raw).ok_or_else(|| {
                    HandlerError::malformed(format!(
                        "severity must be one of info, warning, critical; got '{raw}'"
                    ))
                })?),
                None => None,
            };
            let table_query = TableQuery::of_type(RecordType::Alert, limit)
                .for_device(device_id)
                .with_severity(severity);
            query(table, &table_query).map(Value::Array)
        }
        Route::Analysis => {
            let table_query = TableQuery::of_type(RecordType::Analysis, limit).for_device(device_id);
            query(table, &table_query).map(Value::Array)
        }
        Route::Metrics => {
            let limit = parse_limit(request.query_param("limit"), MAX_LIMIT);
            let table_query = TableQuery::of_type(RecordType::Sensor, limit).for_device(device_id);
            let items = query(table, &table_query)?;
            to_body(&summarize(&decode_sensor_records(items)))
        }
    }
}

/// Positive integer capped at `MAX_LIMIT`; anything else falls back to the
/// default.
pub fn parse_limit(raw: Option<&str>, default: usize) -> usize {
    raw.and_then(|value| value.trim().parse::<usize>().ok())
        .filter(|limit| *limit > 0)
        .map_or(default, |limit| limit.min(MAX_LIMIT))
}

fn query(table: &impl RecordTable, query: &TableQuery) -> Result<Vec<Value>, HandlerError> {
    table
        .query(query)
        .map_err(HandlerError::dependency("dynamodb"))
}

/// Items that do not decode as sensor records are skipped, not fatal.
fn decode_sensor_records(items: Vec<Value>) -> Vec<SensorRecord> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<SensorRecord>(item) {
            Ok(record) => Some(record),
            Err(error) => {
                warn!(component = "api", error = %error, "sensor_record_skipped");
                None
            }
        })
        .collect()
}

fn to_body(payload: &impl Serialize) -> Result<Value, HandlerError> {
    serde_json::to_value(payload).map_err(HandlerError::serialization("response body"))
}

fn response_headers() -> Value {
    json!({
        "Content-Type": "application/json",
        "Access-Control-Allow-Origin": "*",
        "Access-Control-Allow-Methods": "GET,POST,OPTIONS",
        "Access-Control-Allow-Headers": "Content-Type",
    })
}

fn json_response(status_code: u16, body: Value) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: response_headers(),
        body: body.to_string(),
    }
}

fn error_response(status_code: u16, failure: &HandlerError) -> ApiGatewayResponse {
    json_response(status_code, json!({ "error": failure.to_string() }))
}
