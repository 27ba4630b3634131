//! Concurrent fan-out of one batch of tool calls.

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use super::registry::{ToolDispatch, ToolRegistry};
use super::tool::ToolContext;
use crate::types::{Message, Role, ToolCall};

/// Joined result of one dispatch batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    /// Responses in the order their calls completed.
    pub responses: Vec<Message>,
    /// AND of every call's continue signal.
    pub should_continue: bool,
}

/// Runs tool calls against a [`ToolRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct ToolDispatcher<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute every call concurrently and wait for all of them.
    ///
    /// Each call yields at least one response; failures and unknown names
    /// become tool messages instead of errors.
    pub async fn dispatch(&self, calls: &[ToolCall], ctx: &ToolContext) -> DispatchOutcome {
        let mut pending: FuturesUnordered<_> =
            calls.iter().map(|call| self.run_call(call, ctx)).collect();

        let mut responses = Vec::with_capacity(calls.len());
        let mut signals = Vec::with_capacity(calls.len());
        while let Some((messages, should_continue)) = pending.next().await {
            responses.extend(messages);
            signals.push(should_continue);
        }

        DispatchOutcome {
            responses,
            should_continue: signals.into_iter().all(|signal| signal),
        }
    }

    async fn run_call(&self, call: &ToolCall, ctx: &ToolContext) -> (Vec<Message>, bool) {
        let (messages, should_continue) = match self.registry.resolve(&call.name) {
            ToolDispatch::Unknown(name) => {
                warn!(run_id = %ctx.run_id, tool = %name, tool_call_id = %call.id, "unknown tool");
                let text = format!("Unknown tool: {name}");
                (vec![Message::tool_response(call, text.clone()).with_label(text)], true)
            }
            ToolDispatch::Handler(tool) => {
                debug!(run_id = %ctx.run_id, tool = %call.name, tool_call_id = %call.id, "executing tool");
                match tool.execute(call, ctx).await {
                    Ok(output) if output.messages.is_empty() => {
                        (vec![Message::tool_response(call, "")], output.should_continue)
                    }
                    Ok(output) => (output.messages, output.should_continue),
                    Err(err) => {
                        warn!(
                            run_id = %ctx.run_id,
                            tool = %call.name,
                            tool_call_id = %call.id,
                            error = %err,
                            "tool failed"
                        );
                        let failed = Message::tool_response(call, format!("Tool Failed: {err}"));
                        (vec![failed], true)
                    }
                }
            }
        };

        let messages = messages
            .into_iter()
            .map(|message| stamp(message, call, ctx))
            .collect();
        (messages, should_continue)
    }
}

fn stamp(mut message: Message, call: &ToolCall, ctx: &ToolContext) -> Message {
    message.run_id = Some(ctx.run_id);
    if message.role == Role::Tool {
        message.tool_call_id.get_or_insert_with(|| call.id.clone());
        message.name.get_or_insert_with(|| call.name.clone());
    }
    message
}
