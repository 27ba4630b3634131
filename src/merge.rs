//! Delta merging: folds streamed message fragments into the message list.
//!
//! A streamed completion arrives as a sequence of partial [`Message`]s that
//! share one id. The first fragment for an id becomes a new list entry; every
//! later fragment is folded into that entry in place, so list positions never
//! move while a message is being streamed.

use chrono::Utc;

use crate::types::{Attachment, Message, ToolCall};

/// Fold `delta` into `existing`.
///
/// With no existing message the delta is returned verbatim. Otherwise text
/// content and tool-call arguments are concatenated, attachments are
/// appended, metadata keys are overwritten, and the timestamp is refreshed.
/// The existing message's identity, role and kind are kept.
pub fn merge(existing: Option<&Message>, delta: Message) -> Message {
    let Some(existing) = existing else {
        return delta;
    };
    let mut merged = existing.clone();

    if let Some(fragment) = delta.content {
        match merged.content.as_mut() {
            Some(content) => content.push_str(&fragment),
            None => merged.content = Some(fragment),
        }
    }

    for fragment in delta.tool_calls {
        merge_tool_call(&mut merged.tool_calls, fragment);
    }

    merged.attachments.extend(delta.attachments);
    merged.metadata.extend(delta.metadata);

    if merged.run_id.is_none() {
        merged.run_id = delta.run_id;
    }
    if merged.tool_call_id.is_none() {
        merged.tool_call_id = delta.tool_call_id;
    }
    if merged.name.is_none() {
        merged.name = delta.name;
    }

    merged.modified = Utc::now();
    merged
}

fn merge_tool_call(calls: &mut Vec<ToolCall>, fragment: ToolCall) {
    match calls.iter_mut().find(|call| call.id == fragment.id) {
        Some(call) => {
            if call.name.is_empty() {
                call.name = fragment.name;
            }
            call.arguments.push_str(&fragment.arguments);
        }
        None => calls.push(fragment),
    }
}

/// Merge `delta` into the list entry sharing its id, or append it.
///
/// Returns the resulting message as stored in the list.
pub fn apply_delta(messages: &mut Vec<Message>, delta: Message) -> Message {
    match messages.iter().position(|m| m.id == delta.id) {
        Some(index) => {
            let merged = merge(Some(&messages[index]), delta);
            messages[index] = merged.clone();
            merged
        }
        None => {
            messages.push(delta.clone());
            delta
        }
    }
}

/// Replace the entry sharing `message`'s id wholesale, or append it.
pub fn upsert(messages: &mut Vec<Message>, message: Message) -> Message {
    match messages.iter().position(|m| m.id == message.id) {
        Some(index) => messages[index] = message.clone(),
        None => messages.push(message.clone()),
    }
    message
}

/// Attach `attachment` to the entry matching `message`, appending `message`
/// itself when the list does not hold it yet.
pub fn apply_attachment(
    messages: &mut Vec<Message>,
    attachment: Attachment,
    message: &Message,
) -> Message {
    match messages.iter().position(|m| m.id == message.id) {
        Some(index) => {
            let entry = &mut messages[index];
            entry.attachments.push(attachment);
            entry.modified = Utc::now();
            entry.clone()
        }
        None => {
            let mut entry = message.clone();
            entry.attachments.push(attachment);
            messages.push(entry.clone());
            entry
        }
    }
}
