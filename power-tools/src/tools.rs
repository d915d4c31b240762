use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use crate::api::ToolError;
use crate::documents::{DocumentTools, Fields};
use crate::metrics_consts::{TOOL_CALLS_COUNTER, TOOL_ERRORS_COUNTER};
use crate::power::DeviceMetricReporter;

/// How an agent discovers a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: &'static [&'static str],
}

pub const TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "list_databases",
        description: "List every database in the document store",
        arguments: &[],
    },
    ToolDescriptor {
        name: "list_collections",
        description: "List the collections of a database",
        arguments: &["database"],
    },
    ToolDescriptor {
        name: "list_indexes",
        description: "List the indexes of a collection",
        arguments: &["database", "collection"],
    },
    ToolDescriptor {
        name: "create_collection",
        description: "Create a collection in a database",
        arguments: &["database", "collection"],
    },
    ToolDescriptor {
        name: "query_documents",
        description: "Query a collection with a JSON filter; power readings are returned \
                      with their supplemental fields merged in",
        arguments: &["database", "collection", "filter"],
    },
    ToolDescriptor {
        name: "get_first_document",
        description: "Get the first document of a collection, to show its field names",
        arguments: &["database", "collection"],
    },
    ToolDescriptor {
        name: "query_real_time_power_data",
        description: "Look up meters by name and report their live electrical readings \
                      as a Markdown table",
        arguments: &["description"],
    },
];

fn str_argument<'a>(arguments: &'a Fields, name: &str) -> Result<&'a str, ToolError> {
    match arguments.get(name) {
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(_) => Err(ToolError::invalid_argument(name, "must be a string")),
        None => Err(ToolError::invalid_argument(name, "is required")),
    }
}

/// The filter may be given as a JSON string or directly as an object.
fn filter_argument(arguments: &Fields) -> Result<String, ToolError> {
    match arguments.get("filter") {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(filter)) => Ok(filter.clone()),
        Some(filter @ Value::Object(_)) => Ok(filter.to_string()),
        Some(_) => Err(ToolError::invalid_argument(
            "filter",
            "must be a JSON object or a string",
        )),
    }
}

/// Dispatches tool calls by name.
#[derive(Clone)]
pub struct ToolRegistry {
    documents: Arc<DocumentTools>,
    power: Arc<DeviceMetricReporter>,
}

impl ToolRegistry {
    pub fn new(documents: Arc<DocumentTools>, power: Arc<DeviceMetricReporter>) -> Self {
        ToolRegistry { documents, power }
    }

    pub fn descriptors(&self) -> &'static [ToolDescriptor] {
        TOOLS
    }

    pub fn documents(&self) -> &DocumentTools {
        &self.documents
    }

    pub fn power(&self) -> &DeviceMetricReporter {
        &self.power
    }

    pub async fn call(&self, name: &str, arguments: &Fields) -> Result<Value, ToolError> {
        let Some(tool) = TOOLS.iter().find(|tool| tool.name == name) else {
            return Err(ToolError::UnknownTool(name.to_string()));
        };
        metrics::counter!(TOOL_CALLS_COUNTER, "tool" => tool.name).increment(1);

        let result = self.dispatch(tool.name, arguments).await;
        if let Err(e) = &result {
            tracing::warn!(tool = tool.name, "tool call failed: {}", e);
            metrics::counter!(TOOL_ERRORS_COUNTER, "tool" => tool.name, "code" => e.error_code())
                .increment(1);
        }

        result
    }

    async fn dispatch(&self, name: &'static str, arguments: &Fields) -> Result<Value, ToolError> {
        let value = match name {
            "list_databases" => json!(self.documents.list_databases().await?),
            "list_collections" => {
                let database = str_argument(arguments, "database")?;
                json!(self.documents.list_collections(database).await?)
            }
            "list_indexes" => {
                let database = str_argument(arguments, "database")?;
                let collection = str_argument(arguments, "collection")?;
                json!(self.documents.list_indexes(database, collection).await?)
            }
            "create_collection" => {
                let database = str_argument(arguments, "database")?;
                let collection = str_argument(arguments, "collection")?;
                json!(self.documents.create_collection(database, collection).await?)
            }
            "query_documents" => {
                let database = str_argument(arguments, "database")?;
                let collection = str_argument(arguments, "collection")?;
                let filter = filter_argument(arguments)?;
                json!(
                    self.documents
                        .query_documents(database, collection, &filter)
                        .await?
                )
            }
            "get_first_document" => {
                let database = str_argument(arguments, "database")?;
                let collection = str_argument(arguments, "collection")?;
                json!(self.documents.get_first_document(database, collection).await?)
            }
            "query_real_time_power_data" => {
                // a missing description is reported like a blank one
                let description = match arguments.get("description") {
                    None | Some(Value::Null) => "",
                    Some(_) => str_argument(arguments, "description")?,
                };
                json!(self.power.report(description).await?)
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };

        Ok(value)
    }
}
