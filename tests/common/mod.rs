//! Shared test helpers and scripted capability doubles.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use confab::error::ConfabError;
use confab::service::*;
use confab::types::*;

/// One scripted answer of a chat or vision double.
pub enum Script {
    /// Whole completion, for non-streamed calls.
    Reply(Message),
    /// Deltas replayed in order by a streamed call.
    Stream(Vec<Message>),
    /// Deltas, then a stream error.
    StreamThenFail(Vec<Message>, ConfabError),
    /// Deltas; `token` is cancelled once the first delta has been handed out.
    StreamCancelling(Vec<Message>, CancellationToken),
    /// The call itself fails.
    Fail(ConfabError),
}

fn exhausted() -> ConfabError {
    ConfabError::InvalidState("script exhausted".into())
}

fn reply(script: Option<Script>) -> Result<Message, ConfabError> {
    match script {
        Some(Script::Reply(message)) => Ok(message),
        Some(Script::Fail(err)) => Err(err),
        Some(_) => Err(ConfabError::InvalidState("expected a whole reply".into())),
        None => Err(exhausted()),
    }
}

fn stream(script: Option<Script>) -> Result<DeltaStream, ConfabError> {
    match script {
        Some(Script::Stream(deltas)) => Ok(futures::stream::iter(deltas.into_iter().map(Ok)).boxed()),
        Some(Script::StreamThenFail(deltas, err)) => {
            let items = deltas.into_iter().map(Ok).chain(std::iter::once(Err(err)));
            Ok(futures::stream::iter(items).boxed())
        }
        Some(Script::StreamCancelling(deltas, token)) => Ok(futures::stream::iter(deltas)
            .enumerate()
            .map(move |(index, delta)| {
                if index == 0 {
                    token.cancel();
                }
                Ok(delta)
            })
            .boxed()),
        Some(Script::Fail(err)) => Err(err),
        Some(Script::Reply(_)) => Err(ConfabError::InvalidState("expected a stream".into())),
        None => Err(exhausted()),
    }
}

/// Chat double replaying queued scripts and recording every request.
#[derive(Default)]
pub struct ScriptedChat {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ChatServiceRequest>>,
}

impl ScriptedChat {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatServiceRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &ChatServiceRequest) -> Option<Script> {
        self.requests.lock().unwrap().push(request.clone());
        self.scripts.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl ChatService for ScriptedChat {
    async fn completion(&self, request: &ChatServiceRequest) -> Result<Message, ConfabError> {
        reply(self.next(request))
    }

    async fn completion_stream(
        &self,
        request: &ChatServiceRequest,
    ) -> Result<DeltaStream, ConfabError> {
        stream(self.next(request))
    }
}

/// Vision double replaying queued scripts and recording every request.
#[derive(Default)]
pub struct ScriptedVision {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<VisionServiceRequest>>,
}

impl ScriptedVision {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<VisionServiceRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: &VisionServiceRequest) -> Option<Script> {
        self.requests.lock().unwrap().push(request.clone());
        self.scripts.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl VisionService for ScriptedVision {
    async fn completion(&self, request: &VisionServiceRequest) -> Result<Message, ConfabError> {
        reply(self.next(request))
    }

    async fn completion_stream(
        &self,
        request: &VisionServiceRequest,
    ) -> Result<DeltaStream, ConfabError> {
        stream(self.next(request))
    }
}

/// Tool-forced double returning one queued reply per call.
#[derive(Default)]
pub struct ScriptedToolService {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ToolServiceRequest>>,
}

impl ScriptedToolService {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ToolServiceRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolService for ScriptedToolService {
    async fn completion(&self, request: &ToolServiceRequest) -> Result<Message, ConfabError> {
        self.requests.lock().unwrap().push(request.clone());
        reply(self.scripts.lock().unwrap().pop_front())
    }
}

/// Image double returning the same payloads for every prompt.
pub struct FixedImages {
    pub images: Vec<ImageData>,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedImages {
    pub fn new(images: Vec<ImageData>) -> Self {
        Self {
            images,
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ImageService for FixedImages {
    async fn imagine(&self, request: &ImagineServiceRequest) -> Result<Vec<ImageData>, ConfabError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        Ok(self.images.clone())
    }
}

/// Speech double returning fixed audio bytes, or failing when `audio` is `None`.
pub struct FixedSpeech {
    pub audio: Option<Vec<u8>>,
    pub requests: Mutex<Vec<SpeechServiceRequest>>,
}

impl FixedSpeech {
    pub fn new(audio: Option<Vec<u8>>) -> Self {
        Self {
            audio,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.input.clone())
            .collect()
    }
}

#[async_trait]
impl SpeechService for FixedSpeech {
    async fn speak(&self, request: &SpeechServiceRequest) -> Result<Vec<u8>, ConfabError> {
        self.requests.lock().unwrap().push(request.clone());
        self.audio
            .clone()
            .ok_or_else(|| ConfabError::api(500, "speech backend down"))
    }
}

/// Streamed text fragment of assistant message `id`.
pub fn text_delta(id: &str, text: &str) -> Message {
    let mut delta = Message::delta(id, Role::Assistant);
    delta.content = Some(text.to_string());
    delta
}

/// Streamed tool-call fragment of assistant message `id`.
pub fn call_delta(id: &str, call_id: &str, name: &str, arguments: &str) -> Message {
    Message::delta(id, Role::Assistant).with_tool_calls(vec![ToolCall::new(call_id, name, arguments)])
}

/// Whole assistant message requesting `calls`.
pub fn tool_call_message(calls: Vec<ToolCall>) -> Message {
    Message::new(Role::Assistant, None).with_tool_calls(calls)
}
