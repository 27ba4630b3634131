//! confab: conversation orchestration engine
//!
//! Drives a multi-turn exchange with a language model: streamed fragments are
//! merged into an ordered message list, requested tool calls are dispatched
//! concurrently, and their results are fed back until the model answers or
//! the caller cancels.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use confab::prelude::*;
//!
//! # async fn example() -> confab::error::Result<()> {
//! let config = ConfabConfig::load()?;
//! let service = Arc::new(OpenAiService::from_config(&config)?);
//!
//! let manager = MessageManager::new(vec![Message::user("What's the weather?")]);
//! let (handle, _events) = ManagerHandle::spawn(manager);
//! let result = handle
//!     .generate_chat(service, config.chat_model(), ToolRegistry::new(), true)
//!     .await?;
//! println!("{:?}", result.status);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod manager;
pub mod merge;
pub mod prelude;
pub mod run_loop;
pub mod service;
pub mod store;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "cli")]
pub mod cli;
