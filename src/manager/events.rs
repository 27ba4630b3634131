//! Events delivered to whoever is observing a manager.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::ConfabError;
use crate::types::{ImageData, Message, RunId};

/// Something observers should render or react to.
#[derive(Debug, Clone)]
pub enum ManagerEvent {
    /// A message was added or changed; carries its current state.
    Message(Message),
    /// A completion finished and its tool calls are about to be checked.
    Processing { run_id: RunId },
    /// Images generated for `prompt`. They are not stored in the message list.
    Images {
        prompt: Option<String>,
        images: Vec<ImageData>,
    },
    /// A generation failed; the same error is kept as the manager's last error.
    Error(Arc<ConfabError>),
}

pub type EventSender = mpsc::UnboundedSender<ManagerEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ManagerEvent>;

/// Fire-and-forget sender. A dropped receiver is ignored.
#[derive(Debug, Clone, Default)]
pub struct EventEmitter {
    sender: Option<EventSender>,
}

impl EventEmitter {
    pub fn new(sender: EventSender) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    /// Emitter with no observer.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: ManagerEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        let _ = sender.send(event);
    }

    pub fn message(&self, message: &Message) {
        self.emit(ManagerEvent::Message(message.clone()));
    }

    pub fn processing(&self, run_id: RunId) {
        self.emit(ManagerEvent::Processing { run_id });
    }
}
