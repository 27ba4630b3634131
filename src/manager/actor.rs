//! Actor wrapper: one task owns the manager, callers talk to it over channels.

use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::events::{EventReceiver, ManagerEvent};
use super::state::MessageManager;
use crate::error::ConfabError;
use crate::run_loop::RunResult;
use crate::service::{
    ChatService, ImageService, SpeechService, ToolDefinition, ToolService, VisionService,
};
use crate::store::ConversationStore;
use crate::tools::ToolRegistry;
use crate::types::Message;

const COMMAND_BUFFER: usize = 64;

type Reply<T> = oneshot::Sender<T>;

/// Requests processed by the manager task, strictly one at a time.
pub enum ManagerCommand {
    Append {
        message: Message,
        reply: Reply<Result<Message, ConfabError>>,
    },
    Upsert {
        message: Message,
        reply: Reply<Message>,
    },
    Remove {
        id: String,
        reply: Reply<Option<Message>>,
    },
    Messages {
        reply: Reply<Vec<Message>>,
    },
    FilteredMessages {
        reply: Reply<Vec<Message>>,
    },
    Error {
        reply: Reply<Option<Arc<ConfabError>>>,
    },
    ClearError {
        reply: Reply<()>,
    },
    GenerateChat {
        service: Arc<dyn ChatService>,
        model: String,
        tools: ToolRegistry,
        stream: bool,
        cancel: CancellationToken,
        reply: Reply<RunResult>,
    },
    GenerateTool {
        service: Arc<dyn ToolService>,
        model: String,
        tool: ToolDefinition,
        cancel: CancellationToken,
        reply: Reply<RunResult>,
    },
    GenerateVision {
        service: Arc<dyn VisionService>,
        model: String,
        stream: bool,
        cancel: CancellationToken,
        reply: Reply<RunResult>,
    },
    GenerateImage {
        service: Arc<dyn ImageService>,
        model: String,
        prompt: Option<String>,
        cancel: CancellationToken,
        reply: Reply<RunResult>,
    },
    GenerateSpeech {
        service: Arc<dyn SpeechService>,
        model: String,
        voice: Option<String>,
        cancel: CancellationToken,
        reply: Reply<RunResult>,
    },
    Persist {
        store: Arc<dyn ConversationStore>,
        conversation_id: String,
        reply: Reply<Result<(), ConfabError>>,
    },
}

async fn handle(manager: &mut MessageManager, command: ManagerCommand) {
    match command {
        ManagerCommand::Append { message, reply } => {
            let _ = reply.send(manager.append(message));
        }
        ManagerCommand::Upsert { message, reply } => {
            let _ = reply.send(manager.upsert(message));
        }
        ManagerCommand::Remove { id, reply } => {
            let _ = reply.send(manager.remove(&id));
        }
        ManagerCommand::Messages { reply } => {
            let _ = reply.send(manager.messages().to_vec());
        }
        ManagerCommand::FilteredMessages { reply } => {
            let _ = reply.send(manager.filtered_messages());
        }
        ManagerCommand::Error { reply } => {
            let _ = reply.send(manager.error());
        }
        ManagerCommand::ClearError { reply } => {
            manager.clear_error();
            let _ = reply.send(());
        }
        ManagerCommand::GenerateChat {
            service,
            model,
            tools,
            stream,
            cancel,
            reply,
        } => {
            let result = manager
                .generate_chat(service.as_ref(), &model, &tools, stream, &cancel)
                .await;
            let _ = reply.send(result);
        }
        ManagerCommand::GenerateTool {
            service,
            model,
            tool,
            cancel,
            reply,
        } => {
            let result = manager
                .generate_tool(service.as_ref(), &model, &tool, &cancel)
                .await;
            let _ = reply.send(result);
        }
        ManagerCommand::GenerateVision {
            service,
            model,
            stream,
            cancel,
            reply,
        } => {
            let result = manager
                .generate_vision(service.as_ref(), &model, stream, &cancel)
                .await;
            let _ = reply.send(result);
        }
        ManagerCommand::GenerateImage {
            service,
            model,
            prompt,
            cancel,
            reply,
        } => {
            let result = manager
                .generate_image(service.as_ref(), &model, prompt.as_deref(), &cancel)
                .await;
            let _ = reply.send(result);
        }
        ManagerCommand::GenerateSpeech {
            service,
            model,
            voice,
            cancel,
            reply,
        } => {
            let result = manager
                .generate_speech(service.as_ref(), &model, voice.as_deref(), &cancel)
                .await;
            let _ = reply.send(result);
        }
        ManagerCommand::Persist {
            store,
            conversation_id,
            reply,
        } => {
            let _ = reply.send(manager.persist(store.as_ref(), &conversation_id).await);
        }
    }
}

/// Cloneable handle to a manager running in its own task.
///
/// Commands from every clone are queued and run in arrival order, so two
/// generations never overlap on one message list.
#[derive(Clone)]
pub struct ManagerHandle {
    commands: mpsc::Sender<ManagerCommand>,
    cancel: Arc<Mutex<CancellationToken>>,
}

impl ManagerHandle {
    /// Move `manager` into a new task. Its events go to the returned receiver.
    pub fn spawn(manager: MessageManager) -> (Self, ManagerEvents) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, mut command_rx) = mpsc::channel::<ManagerCommand>(COMMAND_BUFFER);
        let mut manager = manager.with_event_sender(event_tx);

        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                handle(&mut manager, command).await;
            }
            debug!("message manager stopped");
        });

        let handle = Self {
            commands: command_tx,
            cancel: Arc::new(Mutex::new(CancellationToken::new())),
        };
        (handle, ManagerEvents { receiver: event_rx })
    }

    /// Cancel the running generation and everything already queued.
    ///
    /// Commands sent afterwards get a fresh token.
    pub fn cancel(&self) {
        let mut token = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        token.cancel();
        *token = CancellationToken::new();
    }

    fn token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> ManagerCommand,
    ) -> Result<T, ConfabError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| ConfabError::ChannelClosed)?;
        response.await.map_err(|_| ConfabError::ChannelClosed)
    }

    pub async fn append(&self, message: Message) -> Result<Message, ConfabError> {
        self.request(|reply| ManagerCommand::Append { message, reply })
            .await?
    }

    pub async fn upsert(&self, message: Message) -> Result<Message, ConfabError> {
        self.request(|reply| ManagerCommand::Upsert { message, reply })
            .await
    }

    pub async fn remove(&self, id: impl Into<String>) -> Result<Option<Message>, ConfabError> {
        let id = id.into();
        self.request(|reply| ManagerCommand::Remove { id, reply }).await
    }

    pub async fn messages(&self) -> Result<Vec<Message>, ConfabError> {
        self.request(|reply| ManagerCommand::Messages { reply }).await
    }

    /// Messages that would be sent to a model right now.
    pub async fn filtered_messages(&self) -> Result<Vec<Message>, ConfabError> {
        self.request(|reply| ManagerCommand::FilteredMessages { reply })
            .await
    }

    pub async fn error(&self) -> Result<Option<Arc<ConfabError>>, ConfabError> {
        self.request(|reply| ManagerCommand::Error { reply }).await
    }

    pub async fn clear_error(&self) -> Result<(), ConfabError> {
        self.request(|reply| ManagerCommand::ClearError { reply }).await
    }

    pub async fn generate_chat(
        &self,
        service: Arc<dyn ChatService>,
        model: impl Into<String>,
        tools: ToolRegistry,
        stream: bool,
    ) -> Result<RunResult, ConfabError> {
        let model = model.into();
        let cancel = self.token();
        self.request(|reply| ManagerCommand::GenerateChat {
            service,
            model,
            tools,
            stream,
            cancel,
            reply,
        })
        .await
    }

    pub async fn generate_tool(
        &self,
        service: Arc<dyn ToolService>,
        model: impl Into<String>,
        tool: ToolDefinition,
    ) -> Result<RunResult, ConfabError> {
        let model = model.into();
        let cancel = self.token();
        self.request(|reply| ManagerCommand::GenerateTool {
            service,
            model,
            tool,
            cancel,
            reply,
        })
        .await
    }

    pub async fn generate_vision(
        &self,
        service: Arc<dyn VisionService>,
        model: impl Into<String>,
        stream: bool,
    ) -> Result<RunResult, ConfabError> {
        let model = model.into();
        let cancel = self.token();
        self.request(|reply| ManagerCommand::GenerateVision {
            service,
            model,
            stream,
            cancel,
            reply,
        })
        .await
    }

    pub async fn generate_image(
        &self,
        service: Arc<dyn ImageService>,
        model: impl Into<String>,
        prompt: Option<String>,
    ) -> Result<RunResult, ConfabError> {
        let model = model.into();
        let cancel = self.token();
        self.request(|reply| ManagerCommand::GenerateImage {
            service,
            model,
            prompt,
            cancel,
            reply,
        })
        .await
    }

    pub async fn generate_speech(
        &self,
        service: Arc<dyn SpeechService>,
        model: impl Into<String>,
        voice: Option<String>,
    ) -> Result<RunResult, ConfabError> {
        let model = model.into();
        let cancel = self.token();
        self.request(|reply| ManagerCommand::GenerateSpeech {
            service,
            model,
            voice,
            cancel,
            reply,
        })
        .await
    }

    pub async fn persist(
        &self,
        store: Arc<dyn ConversationStore>,
        conversation_id: impl Into<String>,
    ) -> Result<(), ConfabError> {
        let conversation_id = conversation_id.into();
        self.request(|reply| ManagerCommand::Persist {
            store,
            conversation_id,
            reply,
        })
        .await?
    }
}

impl std::fmt::Debug for ManagerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerHandle")
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}

/// Events from a spawned manager.
#[derive(Debug)]
pub struct ManagerEvents {
    receiver: EventReceiver,
}

impl ManagerEvents {
    /// Next event; `None` once the manager task is gone and the queue is drained.
    pub async fn recv(&mut self) -> Option<ManagerEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<ManagerEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn into_stream(self) -> UnboundedReceiverStream<ManagerEvent> {
        UnboundedReceiverStream::new(self.receiver)
    }
}

impl Stream for ManagerEvents {
    type Item = ManagerEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}
