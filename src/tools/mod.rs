//! Tool system for function calling.

pub mod arguments;
pub mod builtin;
pub mod dispatcher;
pub mod registry;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use builtin::{PageSummarizer, SearchProvider, SearchResult, Webpage};
pub use dispatcher::{DispatchOutcome, ToolDispatcher};
pub use registry::{BuiltinTool, ToolDispatch, ToolRegistry};
pub use tool::{FnTool, Tool, ToolContext, ToolOutput};
pub use types::{ParameterBuilder, ToolParameters};
