//! Capability contracts consumed by the orchestrator.
//!
//! Each capability (chat, tool-forced, vision, image, speech) is a narrow
//! async trait; the manager and run loop are polymorphic over them.

pub mod http;
#[cfg(feature = "openai")]
pub mod openai;

use async_trait::async_trait;
use bon::Builder;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ConfabError;
use crate::types::{AudioFormat, ImageData, Message};

#[cfg(feature = "openai")]
pub use openai::OpenAiService;

/// Stream of message fragments produced by a streamed completion.
///
/// Every fragment of one assistant message carries the same message id.
pub type DeltaStream = BoxStream<'static, Result<Message, ConfabError>>;

/// Tool definition sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A chat completion request.
#[derive(Debug, Clone, Builder)]
pub struct ChatServiceRequest {
    #[builder(into)]
    pub model: String,
    pub messages: Vec<Message>,
    #[builder(default)]
    pub tools: Vec<ToolDefinition>,
}

/// A completion request that forces the model to call one tool.
#[derive(Debug, Clone, Builder)]
pub struct ToolServiceRequest {
    #[builder(into)]
    pub model: String,
    pub messages: Vec<Message>,
    pub tool: ToolDefinition,
}

/// A multimodal completion request.
#[derive(Debug, Clone, Builder)]
pub struct VisionServiceRequest {
    #[builder(into)]
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
}

/// An image generation request.
#[derive(Debug, Clone, Builder)]
pub struct ImagineServiceRequest {
    #[builder(into)]
    pub model: String,
    #[builder(into)]
    pub prompt: String,
}

/// A speech synthesis request.
#[derive(Debug, Clone, Builder)]
pub struct SpeechServiceRequest {
    #[builder(into)]
    pub voice: String,
    #[builder(into)]
    pub model: String,
    #[builder(into)]
    pub input: String,
    #[builder(default)]
    pub response_format: AudioFormat,
    pub speed: Option<f64>,
}

/// Chat capability: plain and streamed completions with a tool catalog.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn completion(&self, request: &ChatServiceRequest) -> Result<Message, ConfabError>;

    async fn completion_stream(
        &self,
        request: &ChatServiceRequest,
    ) -> Result<DeltaStream, ConfabError>;
}

/// Tool-forced capability: one non-streamed completion pinned to a single tool.
#[async_trait]
pub trait ToolService: Send + Sync {
    async fn completion(&self, request: &ToolServiceRequest) -> Result<Message, ConfabError>;
}

/// Vision capability: same shape as chat, with image content and a token budget.
#[async_trait]
pub trait VisionService: Send + Sync {
    async fn completion(&self, request: &VisionServiceRequest) -> Result<Message, ConfabError>;

    async fn completion_stream(
        &self,
        request: &VisionServiceRequest,
    ) -> Result<DeltaStream, ConfabError>;
}

/// Image generation capability.
#[async_trait]
pub trait ImageService: Send + Sync {
    async fn imagine(&self, request: &ImagineServiceRequest)
        -> Result<Vec<ImageData>, ConfabError>;
}

/// Speech synthesis capability.
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn speak(&self, request: &SpeechServiceRequest) -> Result<Vec<u8>, ConfabError>;
}
