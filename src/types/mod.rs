//! Core data model: messages, tool calls, attachments, media.

pub mod attachment;
pub mod media;
pub mod message;

pub use attachment::*;
pub use media::*;
pub use message::*;
