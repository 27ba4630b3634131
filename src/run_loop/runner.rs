//! The per-turn protocol: request, merge, dispatch, repeat.

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

use super::limits::RunLimits;
use super::types::{RunFailure, RunResult, RunState};
use crate::error::ConfabError;
use crate::manager::EventEmitter;
use crate::merge;
use crate::service::{ChatService, ChatServiceRequest};
use crate::tools::{ToolContext, ToolDispatcher, ToolRegistry};
use crate::types::{sendable, Message, RunId, ToolCall};

/// One chat generation over a borrowed message list.
///
/// The loop is the only writer of the list while it runs. Cancellation is
/// observed before each completion request; a request already in flight and
/// the tool batch it triggers are allowed to finish.
pub struct RunLoop<'a> {
    service: &'a dyn ChatService,
    model: &'a str,
    registry: &'a ToolRegistry,
    emitter: &'a EventEmitter,
    stream: bool,
    limits: RunLimits,
}

impl<'a> RunLoop<'a> {
    pub fn new(
        service: &'a dyn ChatService,
        model: &'a str,
        registry: &'a ToolRegistry,
        emitter: &'a EventEmitter,
    ) -> Self {
        Self {
            service,
            model,
            registry,
            emitter,
            stream: true,
            limits: RunLimits::unbounded(),
        }
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Drive the loop until the model stops calling tools, a tool ends the
    /// run, or `cancel` fires.
    ///
    /// Messages merged before a failure stay in `messages`.
    pub async fn run(
        &self,
        messages: &mut Vec<Message>,
        cancel: &CancellationToken,
    ) -> Result<RunResult, RunFailure> {
        let mut state = RunState::Requesting;
        let mut iterations = 0usize;
        let mut run_id: RunId = Uuid::nil();
        let mut latest: Option<Message> = None;
        let mut pending_calls: Vec<ToolCall> = Vec::new();

        let fail = |iterations: usize, source: ConfabError| RunFailure { iterations, source };

        loop {
            trace!(%run_id, iteration = iterations, %state, "run loop state");
            state = match state {
                RunState::Requesting => {
                    if cancel.is_cancelled() {
                        debug!(iteration = iterations, model = self.model, "run canceled");
                        return Ok(RunResult::canceled(iterations));
                    }
                    self.limits.check(iterations).map_err(|e| fail(iterations, e))?;
                    iterations += 1;
                    run_id = Uuid::new_v4();
                    debug!(%run_id, iteration = iterations, model = self.model, "requesting completion");
                    if self.stream {
                        RunState::Streaming
                    } else {
                        RunState::Awaiting
                    }
                }
                RunState::Streaming => {
                    let request = self.request(messages);
                    let mut deltas = self
                        .service
                        .completion_stream(&request)
                        .await
                        .map_err(|e| fail(iterations, e))?;
                    while let Some(delta) = deltas.next().await {
                        let delta = delta.map_err(|e| fail(iterations, e))?;
                        let merged = merge::apply_delta(messages, delta.with_run_id(run_id));
                        self.emitter.message(&merged);
                        latest = Some(merged);
                    }
                    RunState::ToolCheck
                }
                RunState::Awaiting => {
                    let request = self.request(messages);
                    let message = self
                        .service
                        .completion(&request)
                        .await
                        .map_err(|e| fail(iterations, e))?;
                    let appended = merge::upsert(messages, message.with_run_id(run_id));
                    self.emitter.message(&appended);
                    latest = Some(appended);
                    RunState::ToolCheck
                }
                RunState::ToolCheck => {
                    self.emitter.processing(run_id);
                    pending_calls = latest
                        .take()
                        .map(|message| message.tool_calls)
                        .unwrap_or_default();
                    if pending_calls.is_empty() {
                        RunState::Done
                    } else {
                        RunState::Dispatching
                    }
                }
                RunState::Dispatching => {
                    debug!(%run_id, iteration = iterations, tool_calls = pending_calls.len(), "dispatching tools");
                    let ctx = ToolContext::new(run_id, messages.clone());
                    let outcome = ToolDispatcher::new(self.registry)
                        .dispatch(&pending_calls, &ctx)
                        .await;
                    for response in outcome.responses {
                        let merged = merge::upsert(messages, response);
                        self.emitter.message(&merged);
                    }
                    pending_calls.clear();
                    if outcome.should_continue {
                        RunState::Requesting
                    } else {
                        debug!(%run_id, iteration = iterations, "tool ended the run");
                        RunState::Done
                    }
                }
                RunState::Done => {
                    debug!(%run_id, iterations, "run completed");
                    return Ok(RunResult::completed(iterations));
                }
            };
        }
    }

    fn request(&self, messages: &[Message]) -> ChatServiceRequest {
        ChatServiceRequest::builder()
            .model(self.model)
            .messages(sendable(messages))
            .tools(self.registry.definitions())
            .build()
    }
}
