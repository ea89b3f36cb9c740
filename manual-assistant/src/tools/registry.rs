//! Registry of the tools exposed to the remote assistant.
//!
//! Tool names are derived from enum variants via strum, so the name sent to
//! the assistant and the name matched on dispatch cannot drift apart.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::error::{ServiceError, ServiceResult};

/// All tool names as an exhaustive enum.
///
/// Adding a new tool requires:
/// 1. Add variant here
/// 2. Register metadata in a `tool_defs` module
/// 3. Add a handler in `execution.rs` (compile error if missing due to exhaustive match)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, Display, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    PerformSearch,
}

impl ToolName {
    /// Resolve a name requested by the assistant
    pub fn resolve(name: &str) -> ServiceResult<Self> {
        ToolName::from_str(name).map_err(|_| ServiceError::UnknownTool {
            name: name.to_string(),
        })
    }
}

/// Metadata for a tool definition
#[derive(Debug, Clone)]
pub struct ToolMetadata {
    pub name: ToolName,

    /// Description shown to the assistant
    pub description: &'static str,

    /// JSON Schema for tool parameters
    pub parameters: fn() -> serde_json::Value,
}

/// Central registry of all tools
pub struct ToolRegistry {
    tools: HashMap<ToolName, ToolMetadata>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        let mut tools = HashMap::new();
        super::tool_defs::register_all_tools(&mut tools);
        Self { tools }
    }

    /// All tools as Assistants API function definitions, in enum order
    pub fn definitions(&self) -> Vec<super::ToolDefinition> {
        ToolName::iter()
            .filter_map(|name| self.tools.get(&name))
            .map(|t| super::ToolDefinition {
                tool_type: "function".to_string(),
                function: super::FunctionDefinition {
                    name: t.name.to_string(),
                    description: t.description.to_string(),
                    parameters: (t.parameters)(),
                },
            })
            .collect()
    }

    #[cfg(test)]
    pub fn get(&self, name: ToolName) -> Option<&ToolMetadata> {
        self.tools.get(&name)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global singleton registry instance
pub static REGISTRY: LazyLock<ToolRegistry> = LazyLock::new(ToolRegistry::new);
