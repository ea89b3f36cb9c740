//! Tools the remote assistant may call while a run is in progress.
//!
//! - `registry`: the exhaustive `ToolName` enum and per-tool metadata
//! - `definitions`: function-tool definitions sent when creating assistants
//! - `execution`: dispatch of a requested call to its local handler

pub mod definitions;
pub mod execution;
pub mod registry;
mod tool_defs;

pub use definitions::{FunctionDefinition, ToolDefinition, tool_definitions};
pub use execution::ToolExecutor;
