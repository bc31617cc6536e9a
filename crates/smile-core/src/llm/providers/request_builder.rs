//! Request body builder for OpenAI-compatible chat completion endpoints

use crate::types::{ChatMessage, CompletionOptions, MessageContent, MessagePart};
use reqwest::Url;
use serde_json::{Map, Value, json};

/// Models that accept predicted outputs
const PREDICTION_MODELS: [&str; 3] = ["gpt-4o-mini", "gpt-4o", "mistral-large"];

/// Stop-sequence limit of the host behind `api_base`; `None` means unbounded
pub fn max_stop_words(api_base: &Url, is_azure: bool) -> Option<usize> {
    let host = api_base.host_str().unwrap_or_default();
    if host == "api.deepseek.com" {
        Some(16)
    } else if api_base.port() == Some(1337)
        || host == "api.openai.com"
        || host == "api.groq.com"
        || is_azure
    {
        Some(4)
    } else {
        None
    }
}

fn is_reasoning_model(model: &str) -> bool {
    model.starts_with("o1") || model.starts_with("o3")
}

fn supports_prediction(model: &str) -> bool {
    PREDICTION_MODELS.iter().any(|m| model.contains(m))
}

fn non_blank(text: &str) -> &str {
    if text.is_empty() { " " } else { text }
}

fn text_parts(parts: &[MessagePart]) -> Vec<Value> {
    parts
        .iter()
        .filter_map(|part| match part {
            MessagePart::Text { text } => Some(json!({ "type": "text", "text": text })),
            MessagePart::ImageUrl { .. } => None,
        })
        .collect()
}

fn user_content(content: &MessageContent) -> Value {
    match content {
        MessageContent::Text(text) => json!(non_blank(text)),
        MessageContent::Parts(parts) if !content.has_images() => {
            let joined: String = parts
                .iter()
                .filter_map(|part| match part {
                    MessagePart::Text { text } => Some(text.as_str()),
                    MessagePart::ImageUrl { .. } => None,
                })
                .collect();
            json!(non_blank(&joined))
        }
        MessageContent::Parts(parts) => Value::Array(
            parts
                .iter()
                .map(|part| match part {
                    MessagePart::Text { text } => json!({ "type": "text", "text": text }),
                    MessagePart::ImageUrl { image_url } => json!({
                        "type": "image_url",
                        "image_url": { "url": image_url.url, "detail": "auto" },
                    }),
                })
                .collect(),
        ),
    }
}

/// Convert one message to its wire form
pub fn to_chat_message(message: &ChatMessage) -> Value {
    match message {
        ChatMessage::Tool {
            content,
            tool_call_id,
            ..
        } => json!({
            "role": "tool",
            "content": non_blank(content),
            "tool_call_id": tool_call_id,
        }),
        ChatMessage::System { content, .. } => {
            let content = match content {
                MessageContent::Text(text) => json!(text),
                MessageContent::Parts(parts) => Value::Array(text_parts(parts)),
            };
            json!({ "role": "system", "content": content })
        }
        ChatMessage::Assistant {
            content,
            tool_calls,
            ..
        } => {
            // Some local servers reject empty assistant content
            let content = match content {
                MessageContent::Text(text) => json!(non_blank(text)),
                MessageContent::Parts(parts) => Value::Array(text_parts(parts)),
            };
            let mut message = json!({ "role": "assistant", "content": content });
            if !tool_calls.is_empty() {
                message["tool_calls"] = json!(tool_calls);
            }
            message
        }
        ChatMessage::User { content, .. } => json!({
            "role": "user",
            "content": user_content(content),
        }),
    }
}

/// Build the generic chat completion body. Absent options are omitted.
pub fn to_chat_body(messages: &[ChatMessage], options: &CompletionOptions) -> Value {
    let mut body = Map::new();
    body.insert("model".into(), json!(options.model));
    body.insert(
        "messages".into(),
        Value::Array(messages.iter().map(to_chat_message).collect()),
    );
    body.insert("stream".into(), json!(options.stream));

    let optional = [
        ("max_tokens", options.max_tokens.map(|v| json!(v))),
        ("temperature", options.temperature.map(|v| json!(v))),
        ("top_p", options.top_p.map(|v| json!(v))),
        ("frequency_penalty", options.frequency_penalty.map(|v| json!(v))),
        ("presence_penalty", options.presence_penalty.map(|v| json!(v))),
        ("tool_choice", options.tool_choice.as_ref().map(|v| json!(v))),
        ("prediction", options.prediction.as_ref().map(|v| json!(v))),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            body.insert(key.into(), value);
        }
    }
    if !options.stop.is_empty() {
        body.insert("stop".into(), json!(options.stop));
    }
    if !options.tools.is_empty() {
        body.insert("tools".into(), json!(options.tools));
    }

    Value::Object(body)
}

/// Apply host and model quirks to a body produced by [`to_chat_body`]
pub fn apply_model_rules(body: &mut Value, max_stop_words: Option<usize>) {
    let Some(obj) = body.as_object_mut() else {
        return;
    };
    let model = obj
        .get("model")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let (Some(limit), Some(Value::Array(stop))) = (max_stop_words, obj.get_mut("stop")) {
        stop.truncate(limit);
    }

    if is_reasoning_model(&model) {
        if let Some(max_tokens) = obj.remove("max_tokens") {
            obj.insert("max_completion_tokens".into(), max_tokens);
        }
        if let Some(Value::Array(messages)) = obj.get_mut("messages") {
            for message in messages.iter_mut() {
                if message["role"] == "system" {
                    message["role"] = json!("user");
                }
            }
        }
    }

    if model == "o1" {
        obj.insert("stream".into(), json!(false));
    }

    if obj.contains_key("prediction") {
        if supports_prediction(&model) {
            obj.remove("presence_penalty");
            obj.remove("frequency_penalty");
            obj.remove("max_completion_tokens");
        } else {
            obj.remove("prediction");
        }
    }

    let has_tools = obj
        .get("tools")
        .and_then(Value::as_array)
        .is_some_and(|tools| !tools.is_empty());
    if has_tools && !model.starts_with("o3") {
        obj.insert("parallel_tool_calls".into(), json!(false));
    }
}

/// Merge configured extra properties into the body; they win on conflict
pub fn merge_extra_body(body: &mut Value, extra: &Map<String, Value>) {
    if let Some(obj) = body.as_object_mut() {
        for (key, value) in extra {
            obj.insert(key.clone(), value.clone());
        }
    }
}
