use serde::{Deserialize, Serialize};

// Groq chat message format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// Groq API request format (OpenAI-compatible chat completions)
#[derive(Debug, Serialize, Clone)]
pub struct GroqRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

// Groq API response format; only choices[0].message.content is consumed
#[derive(Debug, Deserialize, Clone)]
pub struct GroqResponse {
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Choice {
    pub message: ChatMessage,
}

impl GroqResponse {
    /// Convenience constructor used by mocks and tests
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice {
                message: ChatMessage {
                    role: "assistant".to_string(),
                    content: content.into(),
                },
            }],
        }
    }

    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
