use serde::{Deserialize, Serialize};

pub const ROLE_SYSTEM: &str = "system";
pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

/// OpenAI-style chat message. `role` stays a free-form string; the module
/// decides which roles it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,
}

impl ChatMessage {
    #[inline]
    pub fn new<R: Into<String>, S: Into<String>>(role: R, content: S) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
            reasoning_content: None,
        }
    }
    #[inline]
    pub fn system<S: Into<String>>(s: S) -> Self {
        Self::new(ROLE_SYSTEM, s)
    }
    #[inline]
    pub fn user<S: Into<String>>(s: S) -> Self {
        Self::new(ROLE_USER, s)
    }
    #[inline]
    pub fn assistant<S: Into<String>>(s: S) -> Self {
        Self::new(ROLE_ASSISTANT, s)
    }

    /// Attach the assistant's reasoning trace.
    pub fn with_reasoning<S: Into<String>>(mut self, reasoning: S) -> Self {
        self.reasoning_content = Some(reasoning.into());
        self
    }
}

/// What the template appends after the last message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Prefill {
    /// Nothing after the transcript.
    None,
    /// The module's standard assistant opener.
    #[default]
    Canonical,
    /// Open assistant turn with a reasoning block left unterminated.
    PartialReasoning { reasoning_content: String },
    /// Closed reasoning block followed by the start of the answer.
    FullReasoning {
        reasoning_content: String,
        content: String,
    },
}

/// Payload of the `chat_template` entry point. Response: raw UTF-8 text.
///
/// Also the JSON shape accepted at the CLI boundary, hence the defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTemplateRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub reasoning_enabled: bool,
    /// `None` lets the module apply its default (canonical).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefill: Option<Prefill>,
    #[serde(default)]
    pub ignore_message_position: bool,
}

impl ChatTemplateRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn with_reasoning(mut self, enabled: bool) -> Self {
        self.reasoning_enabled = enabled;
        self
    }

    pub fn with_prefill(mut self, prefill: Prefill) -> Self {
        self.prefill = Some(prefill);
        self
    }

    pub fn ignoring_message_position(mut self) -> Self {
        self.ignore_message_position = true;
        self
    }
}
