use anyhow::{Result, anyhow};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{ChatMessage, ChatSession, StoredMessage, ToolCall};

pub const HISTORY_LIMIT: usize = 50;

/// Persistence for chat sessions and their message transcripts
/// (`chat_sessions` / `chat_messages` tables).
pub struct SessionService {
    supabase: SupabaseClient,
}

impl SessionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Newest session for the user, or a fresh one. There is no session
    /// timeout: conversation context is kept indefinitely.
    pub async fn get_or_create_session(&self, user_id: Uuid, clinic_uuid: Uuid) -> Result<ChatSession> {
        let path = format!(
            "/rest/v1/chat_sessions?user_id=eq.{}&clinic_id=eq.{}&order=last_message_at.desc&limit=1",
            user_id, clinic_uuid
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        if let Some(row) = rows.into_iter().next() {
            let session: ChatSession = serde_json::from_value(row)?;
            debug!("Using existing session {}", session.id);
            return Ok(session);
        }

        let new_session = json!({
            "user_id": user_id,
            "clinic_id": clinic_uuid,
            "session_data": [],
            "last_message_at": Utc::now().to_rfc3339(),
        });

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        let created: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/chat_sessions",
            None,
            Some(new_session),
            Some(headers),
        ).await?;

        let row = created.into_iter().next()
            .ok_or_else(|| anyhow!("Failed to create chat session"))?;

        debug!("Created new chat session");
        Ok(serde_json::from_value(row)?)
    }

    /// Append one message to the transcript and touch the session.
    pub async fn save_message(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        clinic_uuid: Uuid,
        message: &ChatMessage,
    ) -> Result<()> {
        let row = json!({
            "session_id": session_id,
            "user_id": user_id,
            "clinic_id": clinic_uuid,
            "role": message.role,
            "content": message.content,
            "tool_calls": message.tool_calls,
            "tool_call_id": message.tool_call_id,
            "function_name": message.name,
        });

        self.supabase.execute(Method::POST, "/rest/v1/chat_messages", None, Some(row)).await?;

        let touch = json!({ "last_message_at": Utc::now().to_rfc3339() });
        let path = format!("/rest/v1/chat_sessions?id=eq.{}", session_id);
        self.supabase.execute(Method::PATCH, &path, None, Some(touch)).await?;

        Ok(())
    }

    /// Transcript in chronological order, capped at `limit` messages.
    pub async fn load_history(&self, session_id: Uuid, limit: usize) -> Result<Vec<ChatMessage>> {
        let path = format!(
            "/rest/v1/chat_messages?session_id=eq.{}&order=created_at.asc&limit={}",
            session_id, limit
        );
        let rows: Vec<StoredMessage> = self.supabase.request(Method::GET, &path, None, None).await?;

        let mut history = Vec::with_capacity(rows.len());
        for row in rows {
            let tool_calls = match row.tool_calls {
                Some(raw) if !raw.is_null() => {
                    match serde_json::from_value::<Vec<ToolCall>>(raw) {
                        Ok(calls) => Some(calls),
                        Err(e) => {
                            warn!("Skipping unreadable tool_calls on stored message: {}", e);
                            None
                        }
                    }
                }
                _ => None,
            };

            let name = row.tool_call_id.as_ref().and(row.function_name);

            history.push(ChatMessage {
                role: row.role,
                content: row.content,
                tool_calls,
                tool_call_id: row.tool_call_id,
                name,
            });
        }

        debug!("Loaded {} messages from history", history.len());
        Ok(history)
    }

    /// Write the full transcript into the session's `session_data` column as
    /// a backup copy.
    pub async fn update_session_backup(&self, session_id: Uuid, history: &[ChatMessage]) -> Result<()> {
        let body = json!({
            "session_data": history,
            "last_message_at": Utc::now().to_rfc3339(),
        });
        let path = format!("/rest/v1/chat_sessions?id=eq.{}", session_id);
        self.supabase.execute(Method::PATCH, &path, None, Some(body)).await?;

        Ok(())
    }

    /// Drop every message and session the user has with this clinic.
    pub async fn clear_for_user(&self, user_id: Uuid, clinic_uuid: Uuid) -> Result<()> {
        let messages = format!(
            "/rest/v1/chat_messages?user_id=eq.{}&clinic_id=eq.{}",
            user_id, clinic_uuid
        );
        self.supabase.execute(Method::DELETE, &messages, None, None).await?;

        let sessions = format!(
            "/rest/v1/chat_sessions?user_id=eq.{}&clinic_id=eq.{}",
            user_id, clinic_uuid
        );
        self.supabase.execute(Method::DELETE, &sessions, None, None).await?;

        debug!("Cleared chat history for user {}", user_id);
        Ok(())
    }
}
