use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::SearchProvider;
use crate::error::ConfabError;
use crate::tools::{BuiltinTool, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters};
use crate::types::{Message, ToolCall};

const INSTRUCTIONS: &str = "Use the following search results to choose the top three URLs to \
browse using your `browse_web` function. Do not perform another search. The `browse_web` \
function takes multiple URLs, so avoid calling it several times with a single URL.";

#[derive(Debug, Deserialize)]
struct SearchWebArgs {
    query: String,
}

/// `search_web {query}`: runs a web search and asks the model to browse the best hits.
pub struct SearchWebTool {
    provider: Arc<dyn SearchProvider>,
    parameters: ToolParameters,
}

impl SearchWebTool {
    pub fn new(provider: Arc<dyn SearchProvider>) -> Self {
        Self {
            provider,
            parameters: ToolParameters::object()
                .string("query", "A web search query", true)
                .build(),
        }
    }
}

#[async_trait]
impl Tool for SearchWebTool {
    fn name(&self) -> &str {
        BuiltinTool::SearchWeb.name()
    }

    fn description(&self) -> &str {
        "Search the web for up-to-date information."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolOutput, ConfabError> {
        let args: SearchWebArgs = ToolArguments::decode(call)?;
        let results = self.provider.search(&args.query).await?;
        let results = serde_json::to_string(&results)?;

        let content = format!("{INSTRUCTIONS}\n\nSearch Results:\n{results}");
        let response = Message::tool_response(call, content)
            .with_label(format!("Searched the web for '{}'", args.query));
        Ok(ToolOutput::message(response))
    }
}
