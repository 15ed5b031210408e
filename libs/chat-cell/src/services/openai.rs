use reqwest::{Client, header};
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_config::AppConfig;

use crate::models::{AssistantTurn, ChatCompletionResponse, ChatError, ChatMessage};

const TOOL_TEMPERATURE: f32 = 0.1;
const TOOL_MAX_TOKENS: u32 = 1000;
const SIMPLE_MAX_TOKENS: u32 = 500;

pub struct OpenAiService {
    api_key: String,
    api_base: String,
    model: String,
    http_client: Client,
}

impl OpenAiService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            api_key: config.openai_api_key.clone(),
            api_base: config.openai_api_base.clone(),
            model: config.openai_model.clone(),
            http_client: Client::new(),
        }
    }

    /// One model call over the sanitized transcript, with the booking tools
    /// attached.
    pub async fn chat_with_tools(
        &self,
        system_prompt: &str,
        history: &[ChatMessage],
    ) -> Result<AssistantTurn, ChatError> {
        let mut messages = vec![json!({ "role": "system", "content": system_prompt })];
        for message in sanitize_history(history) {
            messages.push(serde_json::to_value(message)
                .map_err(|e| ChatError::OpenAi(e.to_string()))?);
        }

        let body = json!({
            "model": self.model,
            "messages": messages,
            "tools": tool_schemas(),
            "tool_choice": "auto",
            "temperature": TOOL_TEMPERATURE,
            "max_tokens": TOOL_MAX_TOKENS,
        });

        let reply = self.completions(body).await?;

        Ok(AssistantTurn {
            content: reply.content,
            tool_calls: reply.tool_calls.unwrap_or_default(),
        })
    }

    /// Single-message completion without tools, for utilities.
    pub async fn complete_simple(
        &self,
        message: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, ChatError> {
        let mut messages = Vec::new();
        if let Some(prompt) = system_prompt {
            messages.push(json!({ "role": "system", "content": prompt }));
        }
        messages.push(json!({ "role": "user", "content": message }));

        let body = json!({
            "model": self.model,
            "messages": messages,
            "temperature": TOOL_TEMPERATURE,
            "max_tokens": SIMPLE_MAX_TOKENS,
        });

        let reply = self.completions(body).await?;
        Ok(reply.content.unwrap_or_default())
    }

    async fn completions(&self, body: Value) -> Result<crate::models::AssistantMessage, ChatError> {
        let url = format!("{}/chat/completions", self.api_base);
        debug!("Calling OpenAI chat completions ({})", self.model);

        let response = self.http_client.post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::OpenAi(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChatError::OpenAi(format!("HTTP {}: {}", status, error_text)));
        }

        let completion: ChatCompletionResponse = response.json().await
            .map_err(|e| ChatError::OpenAi(format!("Invalid response format: {}", e)))?;

        completion.choices.into_iter().next()
            .map(|choice| choice.message)
            .ok_or_else(|| ChatError::OpenAi("Response contained no choices".to_string()))
    }
}

/// Keep the transcript loop-protocol clean: a `tool` message is forwarded
/// only while an assistant tool-call message still has unanswered calls.
/// Orphans (e.g. from a truncated history window) would make the API reject
/// the whole request.
pub fn sanitize_history(history: &[ChatMessage]) -> Vec<&ChatMessage> {
    let mut sanitized = Vec::with_capacity(history.len());
    let mut pending_tool_results = 0usize;

    for message in history {
        if message.role == "assistant" && message.has_tool_calls() {
            pending_tool_results = message.tool_calls.as_ref().map_or(0, Vec::len);
            sanitized.push(message);
        } else if message.role == "tool" {
            if pending_tool_results > 0 {
                pending_tool_results -= 1;
                sanitized.push(message);
            } else {
                warn!("Skipping orphan tool message: {:?}", message.tool_call_id);
            }
        } else {
            pending_tool_results = 0;
            sanitized.push(message);
        }
    }

    sanitized
}

pub fn tool_schemas() -> Value {
    json!([
        {
            "type": "function",
            "function": {
                "name": "available_slots",
                "description": "Get available appointment slots for a specific service (automatically finds the right doctor)",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "service": {
                            "type": "string",
                            "description": "The specific service/treatment requested (e.g., 'Hydrafacial', 'Braces', 'Botox')"
                        },
                        "date": {
                            "type": "string",
                            "format": "date",
                            "description": "Date in YYYY-MM-DD format"
                        }
                    },
                    "required": ["service", "date"]
                }
            }
        },
        {
            "type": "function",
            "function": {
                "name": "book_appointment",
                "description": "Book a confirmed appointment for a patient (automatically finds the right doctor for the service)",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "service": {
                            "type": "string",
                            "description": "The specific service/treatment being booked"
                        },
                        "patient_name": {
                            "type": "string",
                            "description": "Full name of the patient"
                        },
                        "slot": {
                            "type": "string",
                            "description": "The selected time slot in format 'YYYY-MM-DD HH:MM AM/PM'"
                        },
                        "patient_phone": {
                            "type": "string",
                            "description": "Patient's phone number (optional but recommended)"
                        }
                    },
                    "required": ["service", "patient_name", "slot"]
                }
            }
        }
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FunctionCall, ToolCall};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(api_base: &str) -> AppConfig {
        AppConfig {
            openai_api_key: "test-openai-key".to_string(),
            openai_model: "gpt-4o".to_string(),
            openai_api_base: api_base.to_string(),
            supabase_url: "http://localhost:0".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            supabase_service_key: "test-service-key".to_string(),
            google_credentials_file: "/nonexistent/credentials.json".to_string(),
            google_calendar_api_base: "http://localhost:0".to_string(),
            default_timezone: "Asia/Karachi".to_string(),
            default_start_hour: 9,
            default_end_hour: 19,
            default_appointment_minutes: 30,
            api_host: "127.0.0.1".to_string(),
            api_port: 8000,
        }
    }

    #[tokio::test]
    async fn simple_completion_returns_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "Salaam! Kaise madad kar sakti hoon?" } }]
            })))
            .mount(&mock_server)
            .await;

        let service = OpenAiService::new(&test_config(&mock_server.uri()));
        let reply = service.complete_simple("hello", Some("You are a receptionist")).await.unwrap();

        assert_eq!(reply, "Salaam! Kaise madad kar sakti hoon?");
    }

    #[tokio::test]
    async fn missing_choices_is_an_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&mock_server)
            .await;

        let service = OpenAiService::new(&test_config(&mock_server.uri()));
        let err = service.complete_simple("hello", None).await.unwrap_err();

        assert!(matches!(err, ChatError::OpenAi(_)));
    }

    fn tool_call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "available_slots".to_string(),
                arguments: "{}".to_string(),
            },
        }
    }

    #[test]
    fn orphan_tool_messages_are_dropped() {
        let history = vec![
            ChatMessage::user("hi"),
            ChatMessage::tool("call_0", "available_slots", "[]"),
            ChatMessage::assistant("hello"),
        ];

        let sanitized = sanitize_history(&history);
        assert_eq!(sanitized.len(), 2);
        assert!(sanitized.iter().all(|m| m.role != "tool"));
    }

    #[test]
    fn paired_tool_messages_survive() {
        let history = vec![
            ChatMessage::user("slots for braces tomorrow?"),
            ChatMessage::assistant_with_tools(None, vec![tool_call("call_1"), tool_call("call_2")]),
            ChatMessage::tool("call_1", "available_slots", "[]"),
            ChatMessage::tool("call_2", "available_slots", "[]"),
            ChatMessage::assistant("No slots, sorry."),
        ];

        let sanitized = sanitize_history(&history);
        assert_eq!(sanitized.len(), 5);
    }

    #[test]
    fn extra_tool_message_beyond_calls_is_dropped() {
        let history = vec![
            ChatMessage::assistant_with_tools(None, vec![tool_call("call_1")]),
            ChatMessage::tool("call_1", "available_slots", "[]"),
            ChatMessage::tool("call_stale", "available_slots", "[]"),
        ];

        let sanitized = sanitize_history(&history);
        assert_eq!(sanitized.len(), 2);
    }

    #[test]
    fn plain_message_resets_pending_results() {
        let history = vec![
            ChatMessage::assistant_with_tools(None, vec![tool_call("call_1")]),
            ChatMessage::user("actually nevermind"),
            ChatMessage::tool("call_1", "available_slots", "[]"),
        ];

        let sanitized = sanitize_history(&history);
        assert_eq!(sanitized.len(), 2);
        assert_eq!(sanitized[1].role, "user");
    }

    #[test]
    fn tool_schemas_describe_both_functions() {
        let schemas = tool_schemas();
        let names: Vec<&str> = schemas.as_array().unwrap().iter()
            .map(|t| t["function"]["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["available_slots", "book_appointment"]);
    }
}
