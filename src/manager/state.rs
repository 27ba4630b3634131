//! The message manager: sole owner of one conversation's message list.

use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use uuid::Uuid;

use super::events::{EventEmitter, EventSender, ManagerEvent};
use crate::config::ManagerSettings;
use crate::error::ConfabError;
use crate::merge;
use crate::run_loop::{RunLoop, RunResult};
use crate::service::{
    ChatService, ImageService, ImagineServiceRequest, SpeechService, SpeechServiceRequest,
    ToolDefinition, ToolService, ToolServiceRequest, VisionService, VisionServiceRequest,
};
use crate::store::{BlobStore, ConversationStore};
use crate::tools::ToolRegistry;
use crate::types::{sendable, Asset, AssetKind, Attachment, AudioFormat, Message, Role};

/// Owns the ordered message list and sequences every generation over it.
///
/// Generation operations never return capability errors. A failure is
/// recorded as the sticky [`error`](Self::error), emitted as
/// [`ManagerEvent::Error`] and reported through a failed [`RunResult`];
/// messages merged before the failure are kept.
pub struct MessageManager {
    messages: Vec<Message>,
    error: Option<Arc<ConfabError>>,
    settings: ManagerSettings,
    blob_store: Option<Arc<dyn BlobStore>>,
    emitter: EventEmitter,
}

impl MessageManager {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            error: None,
            settings: ManagerSettings::default(),
            blob_store: None,
            emitter: EventEmitter::disabled(),
        }
    }

    pub fn with_settings(mut self, settings: ManagerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Where synthesized speech is written.
    pub fn with_blob_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.blob_store = Some(store);
        self
    }

    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.emitter = EventEmitter::new(sender);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Messages that would be sent to a model right now.
    pub fn filtered_messages(&self) -> Vec<Message> {
        sendable(&self.messages)
    }

    /// Last recorded error; stays set until [`clear_error`](Self::clear_error).
    pub fn error(&self) -> Option<Arc<ConfabError>> {
        self.error.clone()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    /// Append a new message. Ids must be unique within the list.
    pub fn append(&mut self, message: Message) -> Result<Message, ConfabError> {
        if self.messages.iter().any(|m| m.id == message.id) {
            return Err(ConfabError::InvalidArgument(format!(
                "message {} is already in the conversation",
                message.id
            )));
        }
        self.messages.push(message.clone());
        self.emitter.message(&message);
        Ok(message)
    }

    /// Replace the message sharing `message`'s id, or append it.
    pub fn upsert(&mut self, message: Message) -> Message {
        let message = merge::upsert(&mut self.messages, message);
        self.emitter.message(&message);
        message
    }

    /// Remove and return the message with `id`, if present.
    pub fn remove(&mut self, id: &str) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Run the full chat loop, dispatching tool calls from `tools`.
    pub async fn generate_chat(
        &mut self,
        service: &dyn ChatService,
        model: &str,
        tools: &ToolRegistry,
        stream: bool,
        cancel: &CancellationToken,
    ) -> RunResult {
        if cancel.is_cancelled() {
            return RunResult::canceled(0);
        }
        let run_loop = RunLoop::new(service, model, tools, &self.emitter)
            .with_stream(stream)
            .with_limits(self.settings.limits);
        let outcome = run_loop.run(&mut self.messages, cancel).await;
        match outcome {
            Ok(result) => result,
            Err(failure) => {
                let result = failure.to_result();
                self.apply_error(failure.source);
                result
            }
        }
    }

    /// One non-streamed completion forced to call `tool`; the reply is appended as-is.
    pub async fn generate_tool(
        &mut self,
        service: &dyn ToolService,
        model: &str,
        tool: &ToolDefinition,
        cancel: &CancellationToken,
    ) -> RunResult {
        if cancel.is_cancelled() {
            return RunResult::canceled(0);
        }
        let request = ToolServiceRequest::builder()
            .model(model)
            .messages(self.filtered_messages())
            .tool(tool.clone())
            .build();
        match service.completion(&request).await {
            Ok(message) => {
                self.upsert(message);
                RunResult::completed(1)
            }
            Err(err) => self.fail(1, err),
        }
    }

    /// Single-turn multimodal completion. Streamed deltas are merged; no tools run.
    pub async fn generate_vision(
        &mut self,
        service: &dyn VisionService,
        model: &str,
        stream: bool,
        cancel: &CancellationToken,
    ) -> RunResult {
        if cancel.is_cancelled() {
            return RunResult::canceled(0);
        }
        let request = VisionServiceRequest::builder()
            .model(model)
            .messages(self.filtered_messages())
            .max_tokens(self.settings.vision_max_tokens)
            .build();

        if !stream {
            return match service.completion(&request).await {
                Ok(message) => {
                    self.upsert(message);
                    RunResult::completed(1)
                }
                Err(err) => self.fail(1, err),
            };
        }

        let mut deltas = match service.completion_stream(&request).await {
            Ok(deltas) => deltas,
            Err(err) => return self.fail(1, err),
        };
        while let Some(delta) = deltas.next().await {
            match delta {
                Ok(delta) => {
                    let merged = merge::apply_delta(&mut self.messages, delta);
                    self.emitter.message(&merged);
                }
                Err(err) => return self.fail(1, err),
            }
        }
        RunResult::completed(1)
    }

    /// Generate images for `prompt`. Payloads go to observers as
    /// [`ManagerEvent::Images`]; the message list is untouched.
    pub async fn generate_image(
        &mut self,
        service: &dyn ImageService,
        model: &str,
        prompt: Option<&str>,
        cancel: &CancellationToken,
    ) -> RunResult {
        if cancel.is_cancelled() {
            return RunResult::canceled(0);
        }
        let request = ImagineServiceRequest::builder()
            .model(model)
            .prompt(prompt.unwrap_or_default())
            .build();
        match service.imagine(&request).await {
            Ok(images) => {
                debug!(model, images = images.len(), "images generated");
                self.emitter.emit(ManagerEvent::Images {
                    prompt: prompt.map(str::to_string),
                    images,
                });
                RunResult::completed(1)
            }
            Err(err) => self.fail(1, err),
        }
    }

    /// Speak the latest sendable message and attach the audio to it.
    ///
    /// Does nothing without a voice, or when that message is not an
    /// assistant message with text.
    pub async fn generate_speech(
        &mut self,
        service: &dyn SpeechService,
        model: &str,
        voice: Option<&str>,
        cancel: &CancellationToken,
    ) -> RunResult {
        let Some(voice) = voice else {
            return RunResult::completed(0);
        };
        if cancel.is_cancelled() {
            return RunResult::canceled(0);
        }
        let Some(message) = self.messages.iter().rev().find(|m| m.is_sendable()).cloned() else {
            return RunResult::completed(0);
        };
        let content = match (&message.role, &message.content) {
            (Role::Assistant, Some(content)) => content.clone(),
            _ => return RunResult::completed(0),
        };
        let Some(store) = self.blob_store.clone() else {
            return self.fail(
                0,
                ConfabError::InvalidState("no blob store configured for speech".into()),
            );
        };

        let format = AudioFormat::default();
        let request = SpeechServiceRequest::builder()
            .voice(voice)
            .model(model)
            .input(content)
            .response_format(format)
            .build();
        let audio = match service.speak(&request).await {
            Ok(audio) => audio,
            Err(err) => return self.fail(1, err),
        };

        let name = format!("{}.{}", Uuid::new_v4(), format.extension());
        let location = match store.put(&name, &audio).await {
            Ok(location) => location,
            Err(err) => return self.fail(1, err),
        };
        let asset = Asset::builder()
            .name(name)
            .kind(AssetKind::Audio)
            .location(location)
            .mime_type(format.mime_type())
            .build();
        let updated = merge::apply_attachment(&mut self.messages, Attachment::Asset(asset), &message);
        self.emitter.message(&updated);
        RunResult::completed(1)
    }

    /// Hand the whole list to `store` under `conversation_id`.
    pub async fn persist(
        &self,
        store: &dyn ConversationStore,
        conversation_id: &str,
    ) -> Result<(), ConfabError> {
        store.upsert_messages(conversation_id, &self.messages).await
    }

    fn fail(&mut self, iterations: usize, err: ConfabError) -> RunResult {
        let result = RunResult::failed(iterations, err.to_string());
        self.apply_error(err);
        result
    }

    fn apply_error(&mut self, err: ConfabError) {
        error!(error = %err, category = ?err.category(), "message manager error");
        let err = Arc::new(err);
        self.error = Some(Arc::clone(&err));
        self.emitter.emit(ManagerEvent::Error(err));
    }
}

impl Default for MessageManager {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl std::fmt::Debug for MessageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageManager")
            .field("messages", &self.messages.len())
            .field("error", &self.error)
            .field("settings", &self.settings)
            .field("blob_store", &self.blob_store.as_ref().map(|_| ".."))
            .finish()
    }
}
