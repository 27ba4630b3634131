use std::sync::Arc;

use async_trait::async_trait;
use futures::future;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::PageSummarizer;
use crate::error::ConfabError;
use crate::tools::{BuiltinTool, Tool, ToolArguments, ToolContext, ToolOutput, ToolParameters};
use crate::types::{Message, ToolCall};

const NO_TITLE: &str = "No Title";
const SUMMARY_FAILED: &str = "Failed to summarize.";

/// A page the model asked to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Webpage {
    #[serde(default)]
    pub title: Option<String>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct BrowseWebArgs {
    webpages: Vec<Webpage>,
}

#[derive(Debug, Serialize)]
struct Source {
    title: String,
    url: String,
    summary: String,
}

/// `browse_web {webpages}`: summarizes every page concurrently.
pub struct BrowseWebTool {
    summarizer: Arc<dyn PageSummarizer>,
    parameters: ToolParameters,
}

impl BrowseWebTool {
    pub fn new(summarizer: Arc<dyn PageSummarizer>) -> Self {
        let webpage = ToolParameters::object()
            .string("title", "Title of the webpage", false)
            .string("url", "URL of the webpage", true)
            .build();
        Self {
            summarizer,
            parameters: ToolParameters::object()
                .array("webpages", "Webpages to read", webpage, true)
                .build(),
        }
    }

    async fn summarize(&self, page: &Webpage) -> Source {
        debug!(url = %page.url, "browsing");
        let summary = match self.summarizer.summarize(&page.url).await {
            Ok(summary) => summary.unwrap_or_default(),
            Err(err) => {
                warn!(url = %page.url, error = %err, "failed to summarize page");
                SUMMARY_FAILED.to_string()
            }
        };
        Source {
            title: page.title.clone().unwrap_or_else(|| NO_TITLE.to_string()),
            url: page.url.clone(),
            summary,
        }
    }
}

fn label(webpages: &[Webpage]) -> String {
    match webpages {
        [page] => {
            let host = reqwest::Url::parse(&page.url)
                .ok()
                .and_then(|url| url.host_str().map(str::to_string))
                .unwrap_or_default();
            format!("Read {host}")
        }
        pages => format!("Read {} webpages", pages.len()),
    }
}

#[async_trait]
impl Tool for BrowseWebTool {
    fn name(&self) -> &str {
        BuiltinTool::BrowseWeb.name()
    }

    fn description(&self) -> &str {
        "Read and summarize a list of webpages."
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, call: &ToolCall, _ctx: &ToolContext) -> Result<ToolOutput, ConfabError> {
        let args: BrowseWebArgs = ToolArguments::decode(call)?;
        let sources =
            future::join_all(args.webpages.iter().map(|page| self.summarize(page))).await;
        let content = serde_json::to_string(&sources)?;

        let response = Message::tool_response(call, content).with_label(label(&args.webpages));
        Ok(ToolOutput::message(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(url: &str) -> Webpage {
        Webpage {
            title: None,
            url: url.to_string(),
        }
    }

    #[test]
    fn single_page_label_uses_the_host() {
        assert_eq!(label(&[page("https://docs.rs/tokio/latest")]), "Read docs.rs");
    }

    #[test]
    fn multi_page_label_counts_pages() {
        assert_eq!(
            label(&[page("https://a.example"), page("https://b.example")]),
            "Read 2 webpages"
        );
    }

    #[test]
    fn unparseable_url_yields_empty_host() {
        assert_eq!(label(&[page("not a url")]), "Read ");
    }
}
