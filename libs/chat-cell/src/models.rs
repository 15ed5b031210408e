use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use user_cell::models::{ChatMessage, FunctionCall, ToolCall};

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub clinic_id: String,
    pub phone_number: String,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub user_id: String,
    pub clinic_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// Canned reply for an empty inbound message; nothing is persisted.
    pub fn empty_prompt() -> Self {
        Self {
            response: "I'm here to help you. Please let me know what you need assistance with."
                .to_string(),
            session_id: String::new(),
            user_id: String::new(),
            clinic_name: String::new(),
            error: None,
        }
    }

    /// The apology contract: internal failures still answer HTTP 200 with a
    /// patient-friendly message and the error tucked into `error`.
    pub fn apology(error: String) -> Self {
        Self {
            response: "I'm sorry, there was an error processing your request. \
                       Please try again or contact our support team."
                .to_string(),
            session_id: String::new(),
            user_id: String::new(),
            clinic_name: String::new(),
            error: Some(error),
        }
    }
}

/// What one model call produced: text, tool calls, or both.
#[derive(Debug, Clone)]
pub struct AssistantTurn {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

// Chat-completions wire shapes (response side).

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Clinic not found: {0}")]
    ClinicNotFound(String),

    #[error("OpenAI API error: {0}")]
    OpenAi(String),

    #[error("Failed to manage user: {0}")]
    User(String),

    #[error("Failed to manage chat session: {0}")]
    Session(String),

    #[error("Database error: {0}")]
    Database(String),
}
