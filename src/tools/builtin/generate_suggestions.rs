use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ConfabError;
use crate::tools::{BuiltinTool, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters};
use crate::types::{Message, ToolCall};

#[derive(Debug, Deserialize)]
struct GenerateSuggestionsArgs {
    suggestions: Vec<String>,
}

/// `generate_suggestions {suggestions}`: records follow-up prompts and ends the run.
pub struct GenerateSuggestionsTool {
    parameters: ToolParameters,
}

impl GenerateSuggestionsTool {
    pub fn new() -> Self {
        Self {
            parameters: ToolParameters::object()
                .string_array("suggestions", "Short follow-up prompts for the user", true)
                .build(),
        }
    }
}

impl Default for GenerateSuggestionsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GenerateSuggestionsTool {
    fn name(&self) -> &str {
        BuiltinTool::GenerateSuggestions.name()
    }

    fn description(&self) -> &str {
        "Return a list of suggested follow-up prompts."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolOutput, ConfabError> {
        let args: GenerateSuggestionsArgs = ToolArguments::decode(call)?;
        let response = Message::tool_response(call, args.suggestions.join("\n"))
            .with_label("Suggested follow-ups");
        Ok(ToolOutput::message(response).terminal())
    }
}
