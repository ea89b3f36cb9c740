//! Local execution of tool calls requested by the assistant.

use serde::{Deserialize, Deserializer};
use std::sync::Arc;
use tracing::{debug, info};

use crate::assistants::RequiredToolCall;
use crate::error::{ServiceError, ServiceResult};
use crate::search::DocumentSearch;

use super::registry::ToolName;

/// Arguments of the `perform_search` tool
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchArgs {
    pub model: String,
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,
    pub search: String,
}

/// Models sometimes send the year as a bare number
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Year::deserialize(deserializer)? {
        Year::Text(s) => s,
        Year::Number(n) => n.to_string(),
    })
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool: ToolName, arguments: &str) -> ServiceResult<T> {
    serde_json::from_str(arguments).map_err(|e| ServiceError::InvalidToolArguments {
        tool: tool.to_string(),
        source: e,
    })
}

/// Dispatches tool calls to their handlers
#[derive(Clone)]
pub struct ToolExecutor {
    search: Arc<dyn DocumentSearch>,
}

impl ToolExecutor {
    pub fn new(search: Arc<dyn DocumentSearch>) -> Self {
        Self { search }
    }

    /// Run one tool call and return its output text.
    ///
    /// Unknown tool names and malformed arguments are errors; failures inside
    /// a tool are reported in the output text instead.
    pub async fn execute(&self, call: &RequiredToolCall) -> ServiceResult<String> {
        let tool = ToolName::resolve(&call.function.name)?;
        debug!(call_id = %call.id, tool = %tool, "Executing tool call");

        let output = match tool {
            ToolName::PerformSearch => {
                let args: SearchArgs = parse_args(tool, &call.function.arguments)?;
                info!(
                    call_id = %call.id,
                    model = %args.model,
                    year = %args.year,
                    search = %args.search,
                    "Assistant requested document search"
                );
                self.search
                    .search(&args.model, &args.year, &args.search)
                    .await
            }
        };

        metrics::counter!("assistant_tool_calls_total", "tool" => tool.to_string()).increment(1);
        Ok(output)
    }
}
