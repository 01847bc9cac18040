//! Tool system for function calling.

pub mod arguments;
pub mod registry;
pub mod search;
pub mod tool;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::ToolRegistry;
pub use search::{semantic_search_tool, Retriever, SearchHit, SearchQuery, SearchResults};
pub use tool::{FunctionTool, IntoToolOutput, Json, OutputSchema, Tool, ToolOutput};
pub use validation::validate_arguments;
