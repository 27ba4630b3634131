//! confab CLI binary entry point.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use confab::cli::{ChatArgs, Cli, Commands, SpeakArgs};
use confab::config::ConfabConfig;
use confab::manager::{ManagerEvent, ManagerEvents, ManagerHandle, MessageManager};
use confab::run_loop::{RunResult, RunStatus};
use confab::service::OpenAiService;
use confab::store::FileBlobStore;
use confab::tools::builtin;
use confab::types::{Message, Role};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CONFAB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Chat(args) => handle_chat(args).await,
        Commands::Speak(args) => handle_speak(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_chat(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfabConfig::load()?;
    let service = Arc::new(OpenAiService::from_config(&config)?);
    let model = args.model.unwrap_or_else(|| config.chat_model().to_string());

    let mut messages = Vec::new();
    if let Some(system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user(args.prompt));

    let manager = MessageManager::new(messages).with_settings(config.manager_settings());
    let (handle, events) = ManagerHandle::spawn(manager);
    let printer = tokio::spawn(print_events(events));

    let ctrl_c = handle.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let result = handle
        .generate_chat(
            service,
            model,
            builtin::generation_tools(),
            config.stream() && !args.no_stream,
        )
        .await;
    watcher.abort();
    drop(handle);
    let _ = printer.await;

    finish(result?)
}

async fn handle_speak(args: SpeakArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfabConfig::load()?;
    let service = Arc::new(OpenAiService::from_config(&config)?);
    let blobs = Arc::new(FileBlobStore::from_config(&config)?);
    let voice = args
        .voice
        .or_else(|| config.voice().map(str::to_string))
        .ok_or("no voice configured; pass --voice")?;

    let manager = MessageManager::new(vec![Message::user(args.prompt)])
        .with_settings(config.manager_settings())
        .with_blob_store(blobs.clone());
    let (handle, events) = ManagerHandle::spawn(manager);
    let printer = tokio::spawn(print_events(events));

    let chat = handle
        .generate_chat(
            service.clone(),
            config.chat_model(),
            builtin::generation_tools(),
            config.stream(),
        )
        .await?;
    if chat.status != RunStatus::Completed {
        drop(handle);
        let _ = printer.await;
        return finish(chat);
    }

    let speech = handle
        .generate_speech(service, config.speech_model(), Some(voice))
        .await?;
    let messages = handle.messages().await?;
    drop(handle);
    let _ = printer.await;

    let audio = messages
        .iter()
        .flat_map(|m| m.attachments.iter())
        .filter_map(|a| a.as_asset())
        .last();
    if let Some(asset) = audio {
        eprintln!("audio: {}", blobs.path_for(&asset.name).display());
    }
    finish(speech)
}

fn finish(result: RunResult) -> Result<(), Box<dyn std::error::Error>> {
    match result.status {
        RunStatus::Failed => Err(result.error.unwrap_or_else(|| "run failed".into()).into()),
        RunStatus::Canceled => {
            eprintln!("canceled");
            Ok(())
        }
        RunStatus::Completed => Ok(()),
    }
}

async fn print_events(mut events: ManagerEvents) {
    let mut printed: HashMap<String, usize> = HashMap::new();
    let mut stdout = std::io::stdout();

    while let Some(event) = events.recv().await {
        match event {
            ManagerEvent::Message(message) if message.role == Role::Assistant => {
                let seen = printed.entry(message.id.clone()).or_insert(0);
                let text = message.text();
                if let Some(fresh) = text.get(*seen..) {
                    let _ = write!(stdout, "{fresh}");
                    let _ = stdout.flush();
                }
                *seen = text.len();
            }
            ManagerEvent::Message(message) if message.role == Role::Tool => {
                if printed.insert(message.id.clone(), 0).is_none() {
                    let label = message.label().or(message.name.as_deref()).unwrap_or("tool");
                    eprintln!("\n[{label}]");
                }
            }
            ManagerEvent::Error(err) => {
                eprintln!("\n{err} ({})", err.recovery_suggestion());
            }
            _ => {}
        }
    }
    println!();
}
