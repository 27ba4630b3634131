//! Core run types for the run loop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::error::ConfabError;

/// Run lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Canceled,
}

/// Result of a generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunResult {
    pub status: RunStatus,
    /// Completion requests made; zero when the run never started.
    pub iterations: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn completed(iterations: usize) -> Self {
        Self {
            status: RunStatus::Completed,
            iterations,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn canceled(iterations: usize) -> Self {
        Self {
            status: RunStatus::Canceled,
            iterations,
            error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(iterations: usize, error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            iterations,
            error: Some(error.into()),
            finished_at: Utc::now(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// A run that stopped on an error after `iterations` completion requests.
#[derive(Debug, thiserror::Error)]
#[error("run failed after {iterations} iteration(s): {source}")]
pub struct RunFailure {
    pub iterations: usize,
    #[source]
    pub source: ConfabError,
}

impl RunFailure {
    pub fn to_result(&self) -> RunResult {
        RunResult::failed(self.iterations, self.source.to_string())
    }
}

/// Run loop state machine.
///
/// `Requesting -> Streaming | Awaiting -> ToolCheck -> Dispatching -> Requesting`,
/// with `ToolCheck` and `Dispatching` able to finish the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RunState {
    Requesting,
    Streaming,
    Awaiting,
    ToolCheck,
    Dispatching,
    Done,
}
