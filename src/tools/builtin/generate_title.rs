use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ConfabError;
use crate::tools::{BuiltinTool, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters};
use crate::types::{Message, ToolCall};

#[derive(Debug, Deserialize)]
struct GenerateTitleArgs {
    title: String,
}

/// `generate_title {title}`: records a conversation title and ends the run.
pub struct GenerateTitleTool {
    parameters: ToolParameters,
}

impl GenerateTitleTool {
    pub fn new() -> Self {
        Self {
            parameters: ToolParameters::object()
                .string("title", "A short title for the conversation", true)
                .build(),
        }
    }
}

impl Default for GenerateTitleTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GenerateTitleTool {
    fn name(&self) -> &str {
        BuiltinTool::GenerateTitle.name()
    }

    fn description(&self) -> &str {
        "Return a title for the conversation."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolOutput, ConfabError> {
        let args: GenerateTitleArgs = ToolArguments::decode(call)?;
        let response = Message::tool_response(call, args.title).with_label("Titled conversation");
        Ok(ToolOutput::message(response).terminal())
    }
}
