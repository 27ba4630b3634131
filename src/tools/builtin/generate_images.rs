use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ConfabError;
use crate::tools::{BuiltinTool, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters};
use crate::types::{Message, ToolCall};

#[derive(Debug, Deserialize)]
struct GenerateImagesArgs {
    prompts: Vec<String>,
}

/// `generate_images {prompts}`: hands image prompts back to the caller.
pub struct GenerateImagesTool {
    parameters: ToolParameters,
}

impl GenerateImagesTool {
    pub fn new() -> Self {
        Self {
            parameters: ToolParameters::object()
                .string_array("prompts", "Detailed prompts, one per image", true)
                .build(),
        }
    }
}

impl Default for GenerateImagesTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for GenerateImagesTool {
    fn name(&self) -> &str {
        BuiltinTool::GenerateImages.name()
    }

    fn description(&self) -> &str {
        "Return prompts for images to generate."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolOutput, ConfabError> {
        let args: GenerateImagesArgs = ToolArguments::decode(call)?;
        let label = match args.prompts.len() {
            1 => "Generating an image".to_string(),
            n => format!("Generating {n} images"),
        };
        let response = Message::tool_response(call, args.prompts.join("\n\n")).with_label(label);
        Ok(ToolOutput::message(response))
    }
}
