//! System prompt construction

use serde::{Deserialize, Serialize};

pub const DEFAULT_PERSONA: &str = "You are a senior assistant and helpful AI assistant";

/// Inputs to the assistant's system prompt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptSettings {
    pub persona: Option<String>,
    pub custom_instructions: Option<String>,
    pub use_markdown: bool,
}

impl PromptSettings {
    pub fn new(persona: Option<String>, custom_instructions: Option<String>) -> Self {
        Self {
            persona,
            custom_instructions,
            use_markdown: false,
        }
    }

    pub fn with_markdown(mut self, use_markdown: bool) -> Self {
        self.use_markdown = use_markdown;
        self
    }

    /// Settings with per-conversation values layered over these
    pub fn overridden_by(&self, persona: Option<&str>, custom_instructions: Option<&str>) -> Self {
        let pick = |own: Option<&str>, fallback: &Option<String>| {
            own.filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .or_else(|| fallback.clone())
        };
        Self {
            persona: pick(persona, &self.persona),
            custom_instructions: pick(custom_instructions, &self.custom_instructions),
            use_markdown: self.use_markdown,
        }
    }
}

const OBJECTIVE: &str = "\
====

OBJECTIVE

You accomplish a given task iteratively, breaking it down into clear steps and working through them methodically.

1. Analyze the user's task and set clear, achievable goals to accomplish it. Prioritize these goals in a logical order.
2. Work through these goals sequentially, utilizing available tools one at a time as necessary. Each goal should correspond to a distinct step in your problem-solving process. You will be informed on the work completed and what's remaining as you go.
3. The user may provide feedback, which you can use to make improvements and try again. But DO NOT continue in pointless back and forth conversations, i.e. don't end your responses with questions or offers for further assistance.
4. If you're unable to complete the task, you should inform the user of the reason and suggest alternative solutions or resources they can use.";

const MARKDOWN_NOTICE: &str = "\
====

NOTICE

The content you return will be in markdown format.";

/// Build the assistant's system prompt
pub fn system_prompt(settings: &PromptSettings) -> String {
    let persona = settings
        .persona
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PERSONA);

    let mut prompt = format!("Your name is Smile Chatbot assistant, {persona}.\n\n");
    if settings.use_markdown {
        prompt.push_str(MARKDOWN_NOTICE);
        prompt.push_str("\n\n");
    }
    prompt.push_str(OBJECTIVE);

    if let Some(instructions) = settings
        .custom_instructions
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        prompt.push_str(
            "\n\n====\n\nUSER'S CUSTOM INSTRUCTIONS\n\n\
             The following additional instructions are provided by the user, \
             and should be followed to the best of your ability.\n\n",
        );
        prompt.push_str(instructions);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_persona_without_extras() {
        let prompt = system_prompt(&PromptSettings::default());
        assert!(prompt.starts_with(
            "Your name is Smile Chatbot assistant, You are a senior assistant and helpful AI assistant."
        ));
        assert!(prompt.contains("OBJECTIVE"));
        assert!(!prompt.contains("NOTICE"));
        assert!(!prompt.contains("CUSTOM INSTRUCTIONS"));
    }

    #[test]
    fn persona_markdown_and_instructions() {
        let settings = PromptSettings::new(Some("a pirate".into()), Some("Answer in French.".into()))
            .with_markdown(true);
        let prompt = system_prompt(&settings);
        assert!(prompt.starts_with("Your name is Smile Chatbot assistant, a pirate."));
        assert!(prompt.contains("markdown format"));
        assert!(prompt.ends_with("Answer in French."));
    }

    #[test]
    fn conversation_values_win_when_present() {
        let global = PromptSettings::new(Some("global".into()), Some("be brief".into()));
        let merged = global.overridden_by(Some("local"), Some("  "));
        assert_eq!(merged.persona.as_deref(), Some("local"));
        assert_eq!(merged.custom_instructions.as_deref(), Some("be brief"));
    }
}
