//! CLI entry point for confab.

use clap::{Parser, Subcommand};

/// confab command line
#[derive(Parser, Debug)]
#[command(name = "confab", version, about = "Drive a tool-using conversation from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with a model; built-in title and suggestion tools are available
    Chat(ChatArgs),
    /// Chat, then speak the answer
    Speak(SpeakArgs),
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Model to use; defaults to the configured chat model
    #[arg(short, long)]
    pub model: Option<String>,

    /// System prompt
    #[arg(short, long)]
    pub system: Option<String>,

    /// Wait for whole completions instead of streaming
    #[arg(long)]
    pub no_stream: bool,

    /// User prompt
    pub prompt: String,
}

/// Arguments for the `speak` subcommand.
#[derive(Parser, Debug)]
pub struct SpeakArgs {
    /// Voice to use; defaults to the configured voice
    #[arg(short, long)]
    pub voice: Option<String>,

    /// User prompt
    pub prompt: String,
}
