//! Persistence boundary: conversation upserts and blob storage.
//!
//! The engine never knows how conversations or blobs are stored; it only
//! calls these traits.

pub mod blob;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::ConfabError;
use crate::merge;
use crate::types::Message;

pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore};

/// External store for conversation transcripts.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Insert or replace `messages` (matched by id) in conversation `conversation_id`.
    async fn upsert_messages(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), ConfabError>;
}

/// In-memory [`ConversationStore`], mostly for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryConversationStore {
    conversations: RwLock<HashMap<String, Vec<Message>>>,
}

impl MemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored messages of `conversation_id`, in first-insert order.
    pub async fn messages(&self, conversation_id: &str) -> Vec<Message> {
        self.conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for MemoryConversationStore {
    async fn upsert_messages(
        &self,
        conversation_id: &str,
        messages: &[Message],
    ) -> Result<(), ConfabError> {
        let mut conversations = self.conversations.write().await;
        let stored = conversations.entry(conversation_id.to_string()).or_default();
        for message in messages {
            merge::upsert(stored, message.clone());
        }
        Ok(())
    }
}
