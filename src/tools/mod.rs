//! Tools agents can call while working on a task.

pub mod base_tool;
pub mod website_search_tool;

pub use base_tool::{BaseTool, Tool, ToolError};
pub use website_search_tool::WebsiteSearchTool;
