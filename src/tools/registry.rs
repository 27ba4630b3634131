//! Name-keyed tool table.

use std::sync::Arc;

use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

use super::tool::Tool;
use crate::service::ToolDefinition;

/// Names of the tools shipped with confab.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, IntoStaticStr, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum BuiltinTool {
    SearchWeb,
    BrowseWeb,
    GenerateImages,
    GenerateSuggestions,
    GenerateTitle,
}

impl BuiltinTool {
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// Terminal tools end the run after their batch is merged.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::GenerateSuggestions | Self::GenerateTitle)
    }
}

/// Result of resolving a called function name.
#[derive(Clone)]
pub enum ToolDispatch {
    Handler(Arc<dyn Tool>),
    Unknown(String),
}

impl std::fmt::Debug for ToolDispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handler(tool) => f.debug_tuple("Handler").field(&tool.name()).finish(),
            Self::Unknown(name) => f.debug_tuple("Unknown").field(name).finish(),
        }
    }
}

/// Tools available to one generation, in registration order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `tool`, replacing any tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn resolve(&self, name: &str) -> ToolDispatch {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| ToolDispatch::Handler(Arc::clone(tool)))
            .unwrap_or_else(|| ToolDispatch::Unknown(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|tool| tool.name() == name)
    }

    /// Catalog sent with completion requests.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|tool| tool.definition()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}
