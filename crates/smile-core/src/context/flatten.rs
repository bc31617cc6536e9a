//! Merging of adjacent same-role messages

use crate::types::{ChatMessage, MessageContent, MessagePart, MessageRole};

const MERGE_SEPARATOR: &str = "\n\n";

/// Merge runs of adjacent messages that share a role.
///
/// Messages carrying tool calls are never merged, and neither are tool
/// results: each answers a distinct call id. Order is preserved; the merged
/// entry keeps the id of the first message in the run.
pub fn flatten_messages(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut flattened: Vec<ChatMessage> = Vec::with_capacity(messages.len());

    for message in messages {
        match flattened.last_mut() {
            Some(previous) if can_merge(previous, &message) => merge_into(previous, message),
            _ => flattened.push(message),
        }
    }

    flattened
}

fn can_merge(previous: &ChatMessage, next: &ChatMessage) -> bool {
    previous.role() == next.role()
        && next.role() != MessageRole::Tool
        && !previous.has_tool_calls()
        && !next.has_tool_calls()
}

fn merge_into(previous: &mut ChatMessage, next: ChatMessage) {
    let incoming = match next {
        ChatMessage::System { content, .. }
        | ChatMessage::User { content, .. }
        | ChatMessage::Assistant { content, .. } => content,
        ChatMessage::Tool { .. } => return,
    };

    if let ChatMessage::System { content, .. }
    | ChatMessage::User { content, .. }
    | ChatMessage::Assistant { content, .. } = previous
    {
        let merged = merge_content(std::mem::take(content), incoming);
        *content = merged;
    }
}

fn merge_content(first: MessageContent, second: MessageContent) -> MessageContent {
    match (first, second) {
        (MessageContent::Text(a), MessageContent::Text(b)) => {
            MessageContent::Text(format!("{}{}{}", a, MERGE_SEPARATOR, b))
        }
        (a, b) => {
            let mut parts = into_parts(a);
            let mut incoming = into_parts(b);
            // Text meeting text across the seam is joined like plain text
            let seam_is_text = matches!(
                (parts.last(), incoming.first()),
                (Some(MessagePart::Text { .. }), Some(MessagePart::Text { .. }))
            );
            if seam_is_text {
                if let (Some(MessagePart::Text { text }), MessagePart::Text { text: next }) =
                    (parts.last_mut(), incoming.remove(0))
                {
                    text.push_str(MERGE_SEPARATOR);
                    text.push_str(&next);
                }
            }
            parts.extend(incoming);
            MessageContent::Parts(parts)
        }
    }
}

fn into_parts(content: MessageContent) -> Vec<MessagePart> {
    match content {
        MessageContent::Text(text) => vec![MessagePart::Text { text }],
        MessageContent::Parts(parts) => parts,
    }
}
