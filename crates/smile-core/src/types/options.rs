//! Completion request options and tool definitions

use serde::{Deserialize, Serialize};

/// Function schema offered to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strict: Option<bool>,
}

/// A tool definition in OpenAI wire shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            kind: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: Some(description.into()),
                parameters: Some(parameters),
                strict: None,
            },
        }
    }
}

/// How the model may pick tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolChoice {
    /// "auto", "none" or "required"
    Mode(String),
    /// Force a specific function
    Function {
        #[serde(rename = "type")]
        kind: String,
        function: ToolChoiceFunction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    pub name: String,
}

impl ToolChoice {
    /// Force the named function
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function {
            kind: "function".to_string(),
            function: ToolChoiceFunction { name: name.into() },
        }
    }
}

/// Predicted output hint for providers that support speculative decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl Prediction {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            kind: "content".to_string(),
            content: content.into(),
        }
    }
}

/// Options for a single completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f32>,
    /// Tokens reserved for the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
    #[serde(default = "default_stream")]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<Prediction>,
}

fn default_stream() -> bool {
    true
}

impl CompletionOptions {
    /// Options for a model with every sampling parameter left to the provider
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            top_p: None,
            frequency_penalty: None,
            presence_penalty: None,
            max_tokens: None,
            stop: Vec::new(),
            stream: true,
            tools: Vec::new(),
            tool_choice: None,
            prediction: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Fill unset fields from `defaults`; values already set here win
    pub fn merged_over(mut self, defaults: &CompletionOptions) -> Self {
        if self.model.is_empty() {
            self.model = defaults.model.clone();
        }
        self.temperature = self.temperature.or(defaults.temperature);
        self.top_p = self.top_p.or(defaults.top_p);
        self.frequency_penalty = self.frequency_penalty.or(defaults.frequency_penalty);
        self.presence_penalty = self.presence_penalty.or(defaults.presence_penalty);
        self.max_tokens = self.max_tokens.or(defaults.max_tokens);
        if self.stop.is_empty() {
            self.stop = defaults.stop.clone();
        }
        if self.tools.is_empty() {
            self.tools = defaults.tools.clone();
        }
        if self.tool_choice.is_none() {
            self.tool_choice = defaults.tool_choice.clone();
        }
        if self.prediction.is_none() {
            self.prediction = defaults.prediction.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_explicit_values() {
        let defaults = CompletionOptions::new("gpt-4o")
            .with_temperature(0.5)
            .with_max_tokens(4096)
            .with_stop(vec!["###".to_string()]);
        let request = CompletionOptions::new("").with_temperature(0.9);

        let merged = request.merged_over(&defaults);
        assert_eq!(merged.model, "gpt-4o");
        assert_eq!(merged.temperature, Some(0.9));
        assert_eq!(merged.max_tokens, Some(4096));
        assert_eq!(merged.stop, vec!["###".to_string()]);
    }

    #[test]
    fn stream_defaults_to_true_when_deserializing() {
        let options: CompletionOptions = serde_json::from_str(r#"{"model":"gpt-4o"}"#).unwrap();
        assert!(options.stream);
        assert!(options.tools.is_empty());
    }
}
