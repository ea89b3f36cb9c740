//! Function-tool definitions in the Assistants API format.

use serde::{Deserialize, Serialize};

use super::registry::REGISTRY;

/// Tool definition as accepted by the `assistants` endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Definitions for every registered tool
pub fn tool_definitions() -> Vec<ToolDefinition> {
    REGISTRY.definitions()
}
