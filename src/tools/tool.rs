//! Tool trait and closure-based tool wrapper.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::types::ToolParameters;
use crate::error::ConfabError;
use crate::service::ToolDefinition;
use crate::types::{Message, RunId, ToolCall};

/// Read-only view handed to every tool of one dispatch batch.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub run_id: RunId,
    /// Snapshot of the conversation when the batch started.
    pub messages: Arc<[Message]>,
}

impl ToolContext {
    pub fn new(run_id: RunId, messages: impl Into<Arc<[Message]>>) -> Self {
        Self {
            run_id,
            messages: messages.into(),
        }
    }
}

/// What a tool hands back to the run loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub messages: Vec<Message>,
    /// `false` ends the run once the current batch is merged.
    pub should_continue: bool,
}

impl ToolOutput {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            should_continue: true,
        }
    }

    pub fn message(message: Message) -> Self {
        Self::new(vec![message])
    }

    /// Mark this output as ending the run.
    pub fn terminal(mut self) -> Self {
        self.should_continue = false;
        self
    }
}

/// Core tool trait. Implement to expose a capability to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (must match what the model calls).
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters(&self) -> &ToolParameters;

    /// Answer `call`. Errors are rendered as a failed tool response by the dispatcher.
    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolOutput, ConfabError>;

    /// Catalog entry sent with completion requests.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters().schema.clone(),
        }
    }
}

type ToolHandler = dyn Fn(
        ToolArguments,
        ToolContext,
    ) -> Pin<Box<dyn Future<Output = Result<ToolOutput, ConfabError>> + Send>>
    + Send
    + Sync;

/// Closure-based tool for quick tool creation.
///
/// Messages returned by the closure are stamped with the answered call's id
/// and name by the dispatcher.
pub struct FnTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    handler: Arc<ToolHandler>,
}

impl FnTool {
    /// Create a tool from a closure.
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: ToolParameters,
        handler: F,
    ) -> Self
    where
        F: Fn(ToolArguments, ToolContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, ConfabError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |args, ctx| Box::pin(handler(args, ctx))),
        }
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, call: &ToolCall, ctx: &ToolContext) -> Result<ToolOutput, ConfabError> {
        let args = ToolArguments::from_call(call)?;
        (self.handler)(args, ctx.clone()).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}
