//! OpenAI-compatible HTTP adapter for every capability.
//!
//! Works against api.openai.com and against local servers exposing the same
//! API (for example an Ollama `/v1` endpoint, where the API key is empty).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::debug;
use uuid::Uuid;

use super::http::{
    bearer_headers, parse_sse_data, shared_client, status_to_error, CONNECT_TIMEOUT,
};
use super::{
    ChatService, ChatServiceRequest, DeltaStream, ImageService, ImagineServiceRequest,
    SpeechService, SpeechServiceRequest, ToolDefinition, ToolService, ToolServiceRequest,
    VisionService, VisionServiceRequest,
};
use crate::config::ConfabConfig;
use crate::error::ConfabError;
use crate::types::{AssetKind, AssetLocation, ImageData, Message, Role, ToolCall};
use crate::util::retry::RetryPolicy;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI-compatible implementation of the chat, tool, vision, image and
/// speech capabilities.
#[derive(Debug, Clone)]
pub struct OpenAiService {
    api_key: String,
    base_url: String,
    timeout: Duration,
    retry_policy: RetryPolicy,
}

impl OpenAiService {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn new_with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Build from resolved configuration.
    ///
    /// A missing API key is only accepted when a custom base URL is set.
    pub fn from_config(config: &ConfabConfig) -> Result<Self, ConfabError> {
        match (config.api_key(), config.base_url()) {
            (Some(key), Some(url)) => Ok(Self::new_with_base_url(key, url)),
            (Some(key), None) => Ok(Self::new(key)),
            (None, Some(url)) => Ok(Self::new_with_base_url("", url)),
            (None, None) => Err(ConfabError::Authentication(
                "Missing OPENAI_API_KEY (or set OPENAI_BASE_URL for a local server)".into(),
            )),
        }
    }

    /// Whole-request timeout, and the idle limit between reads of a stream.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
        timeout: Option<Duration>,
    ) -> Result<reqwest::Response, ConfabError> {
        let url = format!("{}{path}", self.base_url);
        let mut builder = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .json(body);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                let limit = timeout.unwrap_or(CONNECT_TIMEOUT);
                ConfabError::Timeout(limit.as_millis() as u64)
            } else {
                ConfabError::Network(e)
            }
        })?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }
        Ok(resp)
    }

    async fn chat_completion(&self, body: serde_json::Value) -> Result<Message, ConfabError> {
        let body = &body;
        self.retry_policy
            .execute(move || async move {
                let resp = self.post("/chat/completions", body, Some(self.timeout)).await?;
                let data: ChatResponse = resp.json().await?;
                let choice = data
                    .choices
                    .into_iter()
                    .next()
                    .ok_or_else(|| ConfabError::api(200, "No choices in completion response"))?;
                Ok(choice.message.into_message())
            })
            .await
    }

    async fn chat_stream(&self, body: serde_json::Value) -> Result<DeltaStream, ConfabError> {
        let resp = tokio::time::timeout(self.timeout, self.post("/chat/completions", &body, None))
            .await
            .map_err(|_| ConfabError::Timeout(self.timeout.as_millis() as u64))??;
        Ok(sse_deltas(resp.bytes_stream(), self.timeout))
    }
}

/// Decode an SSE byte stream into message fragments sharing one message id.
///
/// Lines are split on raw bytes, so multi-byte characters spanning network
/// reads stay intact. A read that takes longer than `idle_timeout` ends the
/// stream with [`ConfabError::Timeout`]; an in-band `error` event or an
/// undecodable `data:` payload ends it with [`ConfabError::Stream`].
fn sse_deltas<S, B, E>(byte_stream: S, idle_timeout: Duration) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ConfabError> + Send + 'static,
{
    let message_id = Uuid::new_v4().to_string();

    let stream = async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut call_ids: HashMap<u32, String> = HashMap::new();
        futures::pin_mut!(byte_stream);

        loop {
            let next = match tokio::time::timeout(idle_timeout, byte_stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    yield Err(ConfabError::Timeout(idle_timeout.as_millis() as u64));
                    return;
                }
            };
            let chunk = match next {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    let err: ConfabError = e.into();
                    yield Err(err);
                    return;
                }
                None => break,
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=line_end).collect();
                match decode_line(&line, &message_id, &mut call_ids) {
                    Ok(Some(delta)) => yield Ok(delta),
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        // trailing event without a final newline
        match decode_line(&buffer, &message_id, &mut call_ids) {
            Ok(Some(delta)) => yield Ok(delta),
            Ok(None) => {}
            Err(e) => yield Err(e),
        }
    };

    Box::pin(stream)
}

fn decode_line(
    raw: &[u8],
    message_id: &str,
    call_ids: &mut HashMap<u32, String>,
) -> Result<Option<Message>, ConfabError> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| ConfabError::Stream(format!("invalid UTF-8 in event stream: {e}")))?
        .trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(data) = parse_sse_data(line) else {
        return Ok(None);
    };
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| ConfabError::Stream(format!("unparseable stream event: {e}")))?;
    if let Some(error) = chunk.error {
        return Err(ConfabError::Stream(error.message));
    }
    Ok(chunk.into_delta(message_id, call_ids))
}

#[async_trait]
impl ChatService for OpenAiService {
    async fn completion(&self, request: &ChatServiceRequest) -> Result<Message, ConfabError> {
        debug!(model = %request.model, "chat completion");
        let body = chat_body(&request.model, &request.messages, &request.tools, false);
        self.chat_completion(body).await
    }

    async fn completion_stream(
        &self,
        request: &ChatServiceRequest,
    ) -> Result<DeltaStream, ConfabError> {
        debug!(model = %request.model, "chat completion stream");
        let body = chat_body(&request.model, &request.messages, &request.tools, true);
        self.chat_stream(body).await
    }
}

#[async_trait]
impl ToolService for OpenAiService {
    async fn completion(&self, request: &ToolServiceRequest) -> Result<Message, ConfabError> {
        debug!(model = %request.model, tool = %request.tool.name, "tool completion");
        let mut body = chat_body(
            &request.model,
            &request.messages,
            std::slice::from_ref(&request.tool),
            false,
        );
        insert(
            &mut body,
            "tool_choice",
            serde_json::json!({
                "type": "function",
                "function": { "name": request.tool.name },
            }),
        );
        self.chat_completion(body).await
    }
}

#[async_trait]
impl VisionService for OpenAiService {
    async fn completion(&self, request: &VisionServiceRequest) -> Result<Message, ConfabError> {
        debug!(model = %request.model, "vision completion");
        let mut body = chat_body(&request.model, &request.messages, &[], false);
        insert(&mut body, "max_tokens", request.max_tokens.into());
        self.chat_completion(body).await
    }

    async fn completion_stream(
        &self,
        request: &VisionServiceRequest,
    ) -> Result<DeltaStream, ConfabError> {
        debug!(model = %request.model, "vision completion stream");
        let mut body = chat_body(&request.model, &request.messages, &[], true);
        insert(&mut body, "max_tokens", request.max_tokens.into());
        self.chat_stream(body).await
    }
}

#[async_trait]
impl ImageService for OpenAiService {
    async fn imagine(
        &self,
        request: &ImagineServiceRequest,
    ) -> Result<Vec<ImageData>, ConfabError> {
        debug!(model = %request.model, "image generation");
        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "n": 1,
            "response_format": "b64_json",
        });
        let body = &body;
        self.retry_policy
            .execute(move || async move {
                let resp = self.post("/images/generations", body, Some(self.timeout)).await?;
                let data: ImagesResponse = resp.json().await?;
                data.data
                    .into_iter()
                    .filter_map(|image| image.b64_json)
                    .map(|encoded| {
                        base64::engine::general_purpose::STANDARD
                            .decode(encoded)
                            .map_err(|e| {
                                ConfabError::api(200, format!("invalid image payload: {e}"))
                            })
                    })
                    .collect()
            })
            .await
    }
}

#[async_trait]
impl SpeechService for OpenAiService {
    async fn speak(&self, request: &SpeechServiceRequest) -> Result<Vec<u8>, ConfabError> {
        if request.input.trim().is_empty() {
            return Err(ConfabError::InvalidArgument(
                "Speech input cannot be empty".into(),
            ));
        }
        debug!(model = %request.model, voice = %request.voice, "speech synthesis");
        let mut body = serde_json::json!({
            "model": request.model,
            "input": request.input,
            "voice": request.voice,
            "response_format": request.response_format.to_string(),
        });
        if let Some(speed) = request.speed {
            insert(&mut body, "speed", speed.into());
        }
        let body = &body;
        self.retry_policy
            .execute(move || async move {
                let resp = self.post("/audio/speech", body, Some(self.timeout)).await?;
                let bytes = resp.bytes().await?;
                if bytes.is_empty() {
                    return Err(ConfabError::api(200, "Empty audio payload"));
                }
                Ok(bytes.to_vec())
            })
            .await
    }
}

fn insert(body: &mut serde_json::Value, key: &str, value: serde_json::Value) {
    if let Some(obj) = body.as_object_mut() {
        obj.insert(key.to_string(), value);
    }
}

fn chat_body(
    model: &str,
    messages: &[Message],
    tools: &[ToolDefinition],
    stream: bool,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": model,
        "messages": messages.iter().map(message_to_openai).collect::<Vec<_>>(),
        "stream": stream,
    });
    if !tools.is_empty() {
        let tool_defs: Vec<serde_json::Value> = tools
            .iter()
            .map(|t| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
        insert(&mut body, "tools", tool_defs.into());
    }
    body
}

fn message_to_openai(msg: &Message) -> serde_json::Value {
    let role = msg.role.to_string();

    if msg.role == Role::Tool {
        return serde_json::json!({
            "role": role,
            "tool_call_id": msg.tool_call_id,
            "content": msg.text(),
        });
    }

    if msg.has_tool_calls() {
        let tool_calls: Vec<serde_json::Value> = msg
            .tool_calls
            .iter()
            .map(|tc| {
                serde_json::json!({
                    "id": tc.id,
                    "type": "function",
                    "function": { "name": tc.name, "arguments": tc.arguments },
                })
            })
            .collect();
        return serde_json::json!({
            "role": role,
            "content": msg.content,
            "tool_calls": tool_calls,
        });
    }

    let images: Vec<serde_json::Value> = msg
        .attachments
        .iter()
        .filter_map(|a| a.as_asset())
        .filter(|asset| asset.kind == AssetKind::Image && !asset.noop)
        .filter_map(|asset| {
            let url = match asset.location {
                AssetLocation::Url => asset.name.clone(),
                AssetLocation::Inline => format!(
                    "data:{};base64,{}",
                    asset.mime_type.as_deref().unwrap_or("image/png"),
                    asset.data.as_deref()?
                ),
                _ => return None,
            };
            Some(serde_json::json!({ "type": "image_url", "image_url": { "url": url } }))
        })
        .collect();

    if images.is_empty() {
        return serde_json::json!({ "role": role, "content": msg.text() });
    }

    let mut parts = vec![serde_json::json!({ "type": "text", "text": msg.text() })];
    parts.extend(images);
    serde_json::json!({ "role": role, "content": parts })
}

// Wire types (internal)

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

impl ChatMessage {
    fn into_message(self) -> Message {
        let tool_calls = self
            .tool_calls
            .into_iter()
            .map(|tc| ToolCall::new(tc.id, tc.function.name, tc.function.arguments))
            .collect();
        Message::new(Role::Assistant, self.content).with_tool_calls(tool_calls)
    }
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
}

impl StreamChunk {
    /// Convert into a message fragment, stamping every tool-call fragment
    /// with the id first announced for its index.
    fn into_delta(self, message_id: &str, call_ids: &mut HashMap<u32, String>) -> Option<Message> {
        let choice = self.choices.into_iter().next()?;
        let content = choice.delta.content.filter(|c| !c.is_empty());
        let tool_calls: Vec<ToolCall> = choice
            .delta
            .tool_calls
            .into_iter()
            .map(|tc| {
                let id = match tc.id {
                    Some(id) => {
                        call_ids.insert(tc.index, id.clone());
                        id
                    }
                    None => call_ids
                        .entry(tc.index)
                        .or_insert_with(|| format!("call_{}", tc.index))
                        .clone(),
                };
                let (name, arguments) = tc
                    .function
                    .map(|f| (f.name.unwrap_or_default(), f.arguments.unwrap_or_default()))
                    .unwrap_or_default();
                ToolCall::new(id, name, arguments)
            })
            .collect();

        if content.is_none() && tool_calls.is_empty() {
            return None;
        }
        let mut delta = Message::delta(message_id, Role::Assistant).with_tool_calls(tool_calls);
        delta.content = content;
        Some(delta)
    }
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<StreamToolCall>,
}

#[derive(Deserialize)]
struct StreamToolCall {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<StreamFunction>,
}

#[derive(Deserialize)]
struct StreamFunction {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
}
