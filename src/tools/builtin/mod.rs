//! Tools shipped with confab.
//!
//! Web tools reach the outside world only through [`SearchProvider`] and
//! [`PageSummarizer`]; the generation tools just echo structured model output
//! back as labelled tool responses.

mod browse_web;
mod generate_images;
mod generate_suggestions;
mod generate_title;
mod search_web;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::registry::ToolRegistry;
use crate::error::ConfabError;

pub use browse_web::{BrowseWebTool, Webpage};
pub use generate_images::GenerateImagesTool;
pub use generate_suggestions::GenerateSuggestionsTool;
pub use generate_title::GenerateTitleTool;
pub use search_web::SearchWebTool;

/// One web search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Web search backend used by `search_web`.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, ConfabError>;
}

/// Page reader used by `browse_web`.
#[async_trait]
pub trait PageSummarizer: Send + Sync {
    /// Summary of the page at `url`; `None` when the page had nothing to summarize.
    async fn summarize(&self, url: &str) -> Result<Option<String>, ConfabError>;
}

/// Registry with the tools that need no external backend.
pub fn generation_tools() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool(GenerateImagesTool::new())
        .with_tool(GenerateSuggestionsTool::new())
        .with_tool(GenerateTitleTool::new())
}

/// Add `search_web` and `browse_web` backed by the given providers.
pub fn register_web_tools(
    registry: &mut ToolRegistry,
    search: Arc<dyn SearchProvider>,
    summarizer: Arc<dyn PageSummarizer>,
) {
    registry.register(Arc::new(SearchWebTool::new(search)));
    registry.register(Arc::new(BrowseWebTool::new(summarizer)));
}
