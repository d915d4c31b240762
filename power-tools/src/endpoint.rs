use axum::extract::{Path, Query, State};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ToolError;
use crate::documents::Fields;
use crate::router;
use crate::tools::ToolDescriptor;

#[derive(Debug, Serialize)]
pub struct ToolList {
    pub tools: &'static [ToolDescriptor],
}

#[derive(Debug, Serialize)]
pub struct ToolResult {
    pub result: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseParams {
    #[serde(default)]
    pub db_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionParams {
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub collection_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    #[serde(default)]
    pub db_name: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub filter: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct RealtimeParams {
    #[serde(default)]
    pub desc: String,
}

pub async fn list_tools(state: State<router::State>) -> Json<ToolList> {
    Json(ToolList {
        tools: state.tools.descriptors(),
    })
}

/// Calls a tool with the JSON object in the body as its arguments. An empty body
/// calls it without arguments.
pub async fn call_tool(
    state: State<router::State>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolResult>, ToolError> {
    let arguments = parse_arguments(&body)?;
    tracing::debug!(tool = %name, "calling tool");

    let result = state.tools.call(&name, &arguments).await?;
    Ok(Json(ToolResult { result }))
}

fn parse_arguments(body: &[u8]) -> Result<Fields, ToolError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Fields::new());
    }

    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(arguments)) => Ok(arguments),
        Ok(_) => Err(ToolError::invalid_argument("body", "must be a JSON object")),
        Err(e) => Err(ToolError::invalid_argument("body", &e.to_string())),
    }
}

pub async fn databases(state: State<router::State>) -> Result<Json<Vec<String>>, ToolError> {
    Ok(Json(state.tools.documents().list_databases().await?))
}

pub async fn collections(
    state: State<router::State>,
    Query(params): Query<DatabaseParams>,
) -> Result<Json<Vec<String>>, ToolError> {
    Ok(Json(
        state
            .tools
            .documents()
            .list_collections(&params.db_name)
            .await?,
    ))
}

pub async fn indexes(
    state: State<router::State>,
    Query(params): Query<CollectionParams>,
) -> Result<Json<Vec<Fields>>, ToolError> {
    Ok(Json(
        state
            .tools
            .documents()
            .list_indexes(&params.db_name, &params.collection_name)
            .await?,
    ))
}

pub async fn create_collection(
    state: State<router::State>,
    Query(params): Query<CollectionParams>,
) -> Result<String, ToolError> {
    state
        .tools
        .documents()
        .create_collection(&params.db_name, &params.collection_name)
        .await
}

/// Reads the query body with the same error reporting as tool arguments.
fn parse_query_request(body: &[u8]) -> Result<QueryRequest, ToolError> {
    let fields = parse_arguments(body)?;
    serde_json::from_value(Value::Object(fields))
        .map_err(|e| ToolError::invalid_argument("body", &e.to_string()))
}

pub async fn query(
    state: State<router::State>,
    body: Bytes,
) -> Result<Json<Vec<Fields>>, ToolError> {
    let request = parse_query_request(&body)?;
    let filter = match request.filter {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(filter)) => filter,
        Some(filter) => filter.to_string(),
    };

    Ok(Json(
        state
            .tools
            .documents()
            .query_documents(&request.db_name, &request.collection_name, &filter)
            .await?,
    ))
}

pub async fn first_document(
    state: State<router::State>,
    Query(params): Query<CollectionParams>,
) -> Result<Json<Option<Fields>>, ToolError> {
    Ok(Json(
        state
            .tools
            .documents()
            .get_first_document(&params.db_name, &params.collection_name)
            .await?,
    ))
}

pub async fn realtime_power(
    state: State<router::State>,
    Query(params): Query<RealtimeParams>,
) -> Result<String, ToolError> {
    state.tools.power().report(&params.desc).await
}
