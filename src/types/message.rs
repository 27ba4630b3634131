//! Message types for conversation turns.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use super::attachment::Attachment;

/// Identifier grouping every message produced by one pass of the run loop.
pub type RunId = Uuid;

/// Metadata key holding the short human-readable label of a tool response.
pub const LABEL_KEY: &str = "label";

/// A single turn unit in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool responses: the id of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Set on tool responses: the function name of the call being answered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Message {
    /// Create a message with a fresh id.
    pub fn new(role: Role, content: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            kind: MessageKind::Normal,
            attachments: Vec::new(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
            metadata: BTreeMap::new(),
            run_id: None,
            created: now,
            modified: now,
        }
    }

    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, Some(text.into()))
    }

    /// Create a system message that is sent to the model but hidden from the transcript.
    pub fn instruction(text: impl Into<String>) -> Self {
        Self::system(text).with_kind(MessageKind::Instruction)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, Some(text.into()))
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, Some(text.into()))
    }

    /// Create a tool response answering `call`.
    pub fn tool_response(call: &ToolCall, content: impl Into<String>) -> Self {
        let mut message = Self::new(Role::Tool, Some(content.into()));
        message.tool_call_id = Some(call.id.clone());
        message.name = Some(call.name.clone());
        message
    }

    /// An empty fragment addressed at an existing message id.
    ///
    /// Streaming adapters fill in the fragment's content and tool calls.
    pub fn delta(id: impl Into<String>, role: Role) -> Self {
        let mut message = Self::new(role, None);
        message.id = id.into();
        message
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.metadata.insert(LABEL_KEY.to_string(), label.into());
        self
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// The UI label attached to a tool response, if any.
    pub fn label(&self) -> Option<&str> {
        self.metadata.get(LABEL_KEY).map(String::as_str)
    }

    /// Text content, or an empty string.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// Whether this message is included in requests sent to a model.
    pub fn is_sendable(&self) -> bool {
        self.kind.is_sendable()
    }
}

/// The messages of `messages` that are sent to a model, in order.
pub fn sendable(messages: &[Message]) -> Vec<Message> {
    messages.iter().filter(|m| m.is_sendable()).cloned().collect()
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// Tag controlling what is sent to the model and what is shown to the user.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Normal,
    /// Sent to the model, hidden from the transcript.
    Instruction,
    /// A failure shown to the user; never sent.
    Error,
    /// Kept in the list but never sent.
    Ignore,
    /// Local-only content such as UI notices; never sent.
    Local,
}

impl MessageKind {
    pub fn is_sendable(self) -> bool {
        matches!(self, Self::Normal | Self::Instruction)
    }
}

/// A tool invocation requested by the model.
///
/// `arguments` stays raw: while streaming it may be a partial JSON document,
/// and only the matching handler knows how to decode it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}
