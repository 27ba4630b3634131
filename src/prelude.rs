//! Convenience re-exports for common use.

pub use crate::config::{ConfabConfig, ManagerSettings};
pub use crate::error::{ConfabError, Result};
pub use crate::manager::{ManagerEvent, ManagerEvents, ManagerHandle, MessageManager};
pub use crate::run_loop::{RunLimits, RunResult, RunStatus};
pub use crate::service::{ChatService, ImageService, SpeechService, ToolService, VisionService};
pub use crate::store::{BlobStore, ConversationStore};
pub use crate::tools::{FnTool, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters, ToolRegistry};
pub use crate::types::{Attachment, Message, MessageKind, Role, ToolCall};

#[cfg(feature = "openai")]
pub use crate::service::OpenAiService;
