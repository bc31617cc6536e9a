//! Plain-text views of message content

use crate::types::{ChatMessage, MessageContent, MessagePart};

/// Characters kept when a message is summarized
pub const SUMMARY_CHARS: usize = 100;

/// Join the text parts of `content` with newlines, dropping images
pub fn render_content(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                MessagePart::ImageUrl { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

/// Canonical string view of a message
pub fn render_message(message: &ChatMessage) -> String {
    match message {
        ChatMessage::Tool { content, .. } => content.clone(),
        other => other.content().map(render_content).unwrap_or_default(),
    }
}

/// First [`SUMMARY_CHARS`] characters of the rendered message, then "..."
pub fn summarize_message(message: &ChatMessage) -> String {
    let rendered = render_message(message);
    let head: String = rendered.chars().take(SUMMARY_CHARS).collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessagePart;

    #[test]
    fn strips_images_and_joins_text_parts() {
        let msg = ChatMessage::user(vec![
            MessagePart::text("first"),
            MessagePart::image("https://example.com/a.png"),
            MessagePart::text("second"),
        ]);
        assert_eq!(render_message(&msg), "first\nsecond");
    }

    #[test]
    fn tool_results_render_verbatim() {
        let msg = ChatMessage::tool("  raw output\n", "call_1");
        assert_eq!(render_message(&msg), "  raw output\n");
    }

    #[test]
    fn rendering_does_not_mutate() {
        let msg = ChatMessage::assistant(vec![MessagePart::text("x")]);
        let before = msg.clone();
        let _ = render_message(&msg);
        assert_eq!(msg, before);
    }

    #[test]
    fn summary_is_bounded_by_characters() {
        let msg = ChatMessage::user("ü".repeat(250));
        let summary = summarize_message(&msg);
        assert_eq!(summary.chars().count(), SUMMARY_CHARS + 3);
        assert!(summary.ends_with("..."));
    }
}
