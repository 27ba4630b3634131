mod common;

use std::sync::{Arc, Mutex};

use common::*;
use confab::config::ManagerSettings;
use confab::error::ConfabError;
use confab::manager::{EventEmitter, ManagerEvent, MessageManager};
use confab::run_loop::{RunLimits, RunLoop, RunStatus};
use confab::tools::{FnTool, ToolOutput, ToolParameters, ToolRegistry};
use confab::types::{Message, Role, ToolCall};
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

fn weather_tool(queries: Arc<Mutex<Vec<String>>>) -> FnTool {
    FnTool::new(
        "search_web",
        "Search the web",
        ToolParameters::object().string("query", "Query", true).build(),
        move |args, _ctx| {
            let queries = queries.clone();
            async move {
                let query = args.get_str("query")?.to_string();
                queries.lock().unwrap().push(query.clone());
                Ok::<_, ConfabError>(ToolOutput::message(
                    Message::new(Role::Tool, Some("Sunny, 21C".into()))
                        .with_label(format!("Searched the web for '{query}'")),
                ))
            }
        },
    )
}

fn stop_tool(name: &'static str) -> FnTool {
    FnTool::new(name, "Ends the run", ToolParameters::empty(), |_args, _ctx| async {
        Ok(ToolOutput::message(Message::new(Role::Tool, Some("noted".into()))).terminal())
    })
}

#[tokio::test]
async fn weather_scenario_streams_dispatches_and_answers() {
    let queries = Arc::new(Mutex::new(Vec::new()));
    let tools = ToolRegistry::new().with_tool(weather_tool(queries.clone()));
    let chat = ScriptedChat::new(vec![
        Script::Stream(vec![
            call_delta("a1", "call_1", "search_web", r#"{"que"#),
            call_delta("a1", "call_1", "", r#"ry":"weather"}"#),
        ]),
        Script::Stream(vec![
            text_delta("a2", "It is "),
            text_delta("a2", "sunny."),
        ]),
    ]);
    let user = Message::user("What's the weather?");
    let mut manager = MessageManager::new(vec![user.clone()]);

    let result = manager
        .generate_chat(&chat, "gpt-test", &tools, true, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.iterations, 2);
    assert!(manager.error().is_none());
    assert_eq!(queries.lock().unwrap().clone(), vec!["weather".to_string()]);

    let messages = manager.messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0].id, user.id);

    let call_message = &messages[1];
    assert_eq!(call_message.role, Role::Assistant);
    assert_eq!(
        call_message.tool_calls,
        vec![ToolCall::new("call_1", "search_web", r#"{"query":"weather"}"#)]
    );

    let response = &messages[2];
    assert_eq!(response.role, Role::Tool);
    assert_eq!(response.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(response.name.as_deref(), Some("search_web"));
    assert_eq!(response.run_id, call_message.run_id);
    assert_eq!(response.label(), Some("Searched the web for 'weather'"));

    let answer = &messages[3];
    assert_eq!(answer.text(), "It is sunny.");
    assert!(!answer.has_tool_calls());
    assert_ne!(answer.run_id, call_message.run_id);

    let requests = chat.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].tools.len(), 1);
    assert_eq!(requests[1].messages.len(), 3, "tool response is sent back");
}

#[tokio::test]
async fn plain_answer_terminates_after_one_iteration() {
    let chat = ScriptedChat::new(vec![Script::Reply(Message::assistant("Hello!"))]);
    let mut manager = MessageManager::new(vec![Message::user("hi")]);

    let result = manager
        .generate_chat(&chat, "m", &ToolRegistry::new(), false, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.iterations, 1);
    assert_eq!(chat.requests().len(), 1);
    assert_eq!(manager.messages().len(), 2);
    assert!(manager.messages()[1].run_id.is_some());
}

#[tokio::test]
async fn one_stop_signal_ends_the_run_after_merging_every_response() {
    let queries = Arc::new(Mutex::new(Vec::new()));
    let tools = ToolRegistry::new()
        .with_tool(weather_tool(queries))
        .with_tool(stop_tool("generate_title"));
    let chat = ScriptedChat::new(vec![Script::Reply(tool_call_message(vec![
        ToolCall::new("c1", "search_web", r#"{"query":"a"}"#),
        ToolCall::new("c2", "generate_title", "{}"),
        ToolCall::new("c3", "search_web", r#"{"query":"b"}"#),
    ]))]);
    let mut manager = MessageManager::new(vec![Message::user("go")]);

    let result = manager
        .generate_chat(&chat, "m", &tools, false, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.iterations, 1);
    assert_eq!(chat.requests().len(), 1);
    let responses: Vec<_> = manager
        .messages()
        .iter()
        .filter(|m| m.role == Role::Tool)
        .collect();
    assert_eq!(responses.len(), 3);
}

#[tokio::test]
async fn tool_failures_and_unknown_tools_are_fed_back() {
    let failing = FnTool::new("broken", "Always fails", ToolParameters::empty(), |_args, _ctx| async {
        Err(ConfabError::tool("broken", "backend unavailable"))
    });
    let tools = ToolRegistry::new().with_tool(failing);
    let chat = ScriptedChat::new(vec![
        Script::Reply(tool_call_message(vec![
            ToolCall::new("c1", "broken", "{}"),
            ToolCall::new("c2", "teleport", "{}"),
        ])),
        Script::Reply(Message::assistant("Sorry, I could not do that.")),
    ]);
    let mut manager = MessageManager::new(vec![Message::user("go")]);

    let result = manager
        .generate_chat(&chat, "m", &tools, false, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.iterations, 2);
    assert!(manager.error().is_none());

    let second_request = &chat.requests()[1];
    let tool_texts: Vec<_> = second_request
        .messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(tool_texts.len(), 2);
    assert!(tool_texts.iter().any(|t| t.starts_with("Tool Failed: ")));
    assert!(tool_texts.iter().any(|t| t == "Unknown tool: teleport"));
}

#[tokio::test]
async fn cancel_during_dispatch_finishes_the_batch_then_stops() {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let canceling = FnTool::new("slow", "Cancels mid-run", ToolParameters::empty(), move |_args, _ctx| {
        let trigger = trigger.clone();
        async move {
            trigger.cancel();
            Ok(ToolOutput::message(Message::new(Role::Tool, Some("done".into()))))
        }
    });
    let tools = ToolRegistry::new().with_tool(canceling);
    let chat = ScriptedChat::new(vec![Script::Reply(tool_call_message(vec![ToolCall::new(
        "c1", "slow", "",
    )]))]);
    let mut manager = MessageManager::new(vec![Message::user("go")]);

    let result = manager.generate_chat(&chat, "m", &tools, false, &cancel).await;

    assert_eq!(result.status, RunStatus::Canceled);
    assert_eq!(result.iterations, 1);
    assert_eq!(chat.requests().len(), 1);
    assert!(manager.error().is_none(), "cancellation is not an error");
    let last = manager.messages().last().unwrap();
    assert_eq!(last.role, Role::Tool);
    assert_eq!(last.tool_call_id.as_deref(), Some("c1"));
}

#[tokio::test]
async fn cancel_mid_stream_keeps_every_merged_delta() {
    let cancel = CancellationToken::new();
    let chat = ScriptedChat::new(vec![Script::StreamCancelling(
        vec![
            text_delta("a1", "Hel"),
            text_delta("a1", "lo"),
            call_delta("a1", "c1", "missing_tool", "{}"),
        ],
        cancel.clone(),
    )]);
    let mut manager = MessageManager::new(vec![Message::user("hi")]);

    let result = manager
        .generate_chat(&chat, "m", &ToolRegistry::new(), true, &cancel)
        .await;

    assert_eq!(result.status, RunStatus::Canceled);
    let assistant = &manager.messages()[1];
    assert_eq!(assistant.text(), "Hello");
    assert_eq!(assistant.tool_calls.len(), 1);
    assert_eq!(manager.messages().len(), 3, "the in-flight batch is answered");
    assert_eq!(chat.requests().len(), 1);
}

#[tokio::test]
async fn pre_cancelled_token_makes_no_request() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let chat = ScriptedChat::new(Vec::new());
    let mut manager = MessageManager::new(vec![Message::user("hi")]);

    let result = manager
        .generate_chat(&chat, "m", &ToolRegistry::new(), true, &cancel)
        .await;

    assert_eq!(result.status, RunStatus::Canceled);
    assert_eq!(result.iterations, 0);
    assert!(chat.requests().is_empty());
}

#[tokio::test]
async fn iteration_limit_fails_the_run_and_records_the_error() {
    let queries = Arc::new(Mutex::new(Vec::new()));
    let tools = ToolRegistry::new().with_tool(weather_tool(queries));
    let looping = || {
        Script::Reply(tool_call_message(vec![ToolCall::new(
            uuid_like(),
            "search_web",
            r#"{"query":"again"}"#,
        )]))
    };
    let chat = ScriptedChat::new(vec![looping(), looping(), looping()]);
    let settings = ManagerSettings {
        limits: RunLimits::bounded(2),
        ..ManagerSettings::default()
    };
    let mut manager = MessageManager::new(vec![Message::user("loop")]).with_settings(settings);

    let result = manager
        .generate_chat(&chat, "m", &tools, false, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert_eq!(result.iterations, 2);
    assert_eq!(chat.requests().len(), 2);
    assert!(matches!(
        manager.error().as_deref(),
        Some(ConfabError::IterationLimit { max_iterations: 2 })
    ));
    // user + 2 x (assistant + tool response)
    assert_eq!(manager.messages().len(), 5);
}

fn uuid_like() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[tokio::test]
async fn stream_error_keeps_partial_message_and_sets_error() {
    let chat = ScriptedChat::new(vec![Script::StreamThenFail(
        vec![text_delta("a1", "partial")],
        ConfabError::Stream("connection reset".into()),
    )]);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut manager = MessageManager::new(vec![Message::user("hi")]).with_event_sender(tx);

    let result = manager
        .generate_chat(&chat, "m", &ToolRegistry::new(), true, &CancellationToken::new())
        .await;

    assert_eq!(result.status, RunStatus::Failed);
    assert!(result.error.unwrap().contains("connection reset"));
    assert_eq!(manager.messages()[1].text(), "partial");
    assert!(matches!(manager.error().as_deref(), Some(ConfabError::Stream(_))));

    let mut saw_error = false;
    while let Ok(event) = rx.try_recv() {
        if let ManagerEvent::Error(err) = event {
            saw_error = matches!(err.as_ref(), ConfabError::Stream(_));
        }
    }
    assert!(saw_error);
}

#[tokio::test]
async fn every_delta_is_forwarded_in_order() {
    let chat = ScriptedChat::new(vec![Script::Stream(vec![
        text_delta("a1", "1"),
        text_delta("a1", "2"),
        text_delta("a1", "3"),
    ])]);
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let emitter = EventEmitter::new(tx);
    let registry = ToolRegistry::new();
    let mut messages = vec![Message::user("count")];

    let result = RunLoop::new(&chat, "m", &registry, &emitter)
        .run(&mut messages, &CancellationToken::new())
        .await
        .unwrap();
    drop(emitter);

    assert_eq!(result.status, RunStatus::Completed);
    let mut seen = Vec::new();
    let mut processing = 0;
    while let Some(event) = rx.recv().await {
        match event {
            ManagerEvent::Message(m) => seen.push(m.text().to_string()),
            ManagerEvent::Processing { .. } => processing += 1,
            _ => {}
        }
    }
    assert_eq!(seen, vec!["1", "12", "123"]);
    assert_eq!(processing, 1);
}

#[tokio::test]
async fn error_and_local_messages_are_not_sent() {
    use confab::types::MessageKind;

    let chat = ScriptedChat::new(vec![Script::Reply(Message::assistant("ok"))]);
    let mut manager = MessageManager::new(vec![
        Message::instruction("be brief"),
        Message::user("earlier failure").with_kind(MessageKind::Error),
        Message::assistant("typing...").with_kind(MessageKind::Local),
        Message::user("hi"),
    ]);

    manager
        .generate_chat(&chat, "m", &ToolRegistry::new(), false, &CancellationToken::new())
        .await;

    let sent: Vec<_> = chat.requests()[0]
        .messages
        .iter()
        .map(|m| m.text().to_string())
        .collect();
    assert_eq!(sent, vec!["be brief", "hi"]);
}
