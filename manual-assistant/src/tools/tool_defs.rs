//! Tool definitions organized by category.
//!
//! Each submodule provides a registration function that adds its tools to
//! the registry.

mod document;

use std::collections::HashMap;

use super::registry::{ToolMetadata, ToolName};

/// Register all tools from all categories into the registry.
pub fn register_all_tools(registry: &mut HashMap<ToolName, ToolMetadata>) {
    document::register(registry);
}
