// libs/chat-cell/tests/handlers_test.rs
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chat_cell::handlers;
use chat_cell::models::ChatRequest;
use shared_config::AppConfig;
use shared_models::error::AppError;

/// One mock server plays both Supabase and OpenAI; the paths never collide.
fn test_config(base_url: &str) -> AppConfig {
    AppConfig {
        openai_api_key: "test-openai-key".to_string(),
        openai_model: "gpt-4o".to_string(),
        openai_api_base: base_url.to_string(),
        supabase_url: base_url.to_string(),
        supabase_anon_key: "test-anon-key".to_string(),
        supabase_service_key: "test-service-key".to_string(),
        google_credentials_file: "/nonexistent/credentials.json".to_string(),
        google_calendar_api_base: base_url.to_string(),
        default_timezone: "Asia/Karachi".to_string(),
        default_start_hour: 9,
        default_end_hour: 19,
        default_appointment_minutes: 30,
        api_host: "127.0.0.1".to_string(),
        api_port: 8000,
    }
}

fn chat_request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        clinic_id: "skin_and_smile_clinic_lahore".to_string(),
        phone_number: "+923001234567".to_string(),
        user_name: Some("Ali Khan".to_string()),
    }
}

/// Everything a chat turn touches in Supabase: clinic + doctors, user
/// get-or-create, session get-or-create, history load, message writes.
async fn mount_supabase(mock_server: &MockServer, user_id: Uuid, clinic_uuid: Uuid, session_id: Uuid) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": clinic_uuid,
            "clinic_id": "skin_and_smile_clinic_lahore",
            "clinic_name": "Skin and Smile Clinic",
            "phone": "03458589440",
            "whatsapp_contact": "03001234567",
            "address": "Johar Town, Lahore",
            "timezone": "Asia/Karachi",
            "config": {},
            "created_at": null,
            "updated_at": null
        }])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "clinic_id": clinic_uuid,
            "name": "Wajeeha Nusrat",
            "speciality": "Dermatologist",
            "calendar_email": "derma@example.com",
            "timings": "Mon-Fri 12pm-6pm",
            "services": { "Hydrafacial": "60 min" }
        }])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": user_id,
            "phone_number": "+923001234567",
            "clinic_id": clinic_uuid,
            "name": "Ali Khan",
            "last_active": "2025-07-21T08:00:00+00:00",
            "created_at": "2025-07-21T08:00:00+00:00"
        }])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/chat_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/chat_sessions"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": session_id,
            "user_id": user_id,
            "clinic_id": clinic_uuid,
            "last_message_at": "2025-07-21T08:00:00+00:00",
            "created_at": "2025-07-21T08:00:00+00:00"
        }])))
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/chat_messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/chat_messages"))
        .respond_with(ResponseTemplate::new(201))
        .mount(mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/chat_sessions"))
        .respond_with(ResponseTemplate::new(204))
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_chat_happy_path_without_tools() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let clinic_uuid = Uuid::new_v4();
    let session_id = Uuid::new_v4();

    mount_supabase(&mock_server, user_id, clinic_uuid, session_id).await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "Hello! We offer Hydrafacial with Dr. Wajeeha Nusrat. Would you like to book an appointment?"
                }
            }]
        })))
        .mount(&mock_server)
        .await;

    let state = Arc::new(test_config(&mock_server.uri()));
    let Json(response) = handlers::chat(State(state), Json(chat_request("What services do you offer?")))
        .await
        .unwrap();

    assert!(response.response.contains("Hydrafacial"));
    assert_eq!(response.session_id, session_id.to_string());
    assert_eq!(response.user_id, user_id.to_string());
    assert_eq!(response.clinic_name, "Skin and Smile Clinic");
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_chat_executes_a_tool_round() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let clinic_uuid = Uuid::new_v4();
    let session_id = Uuid::new_v4();

    mount_supabase(&mock_server, user_id, clinic_uuid, session_id).await;

    // First model call asks for slots; the calendar is unconfigured in tests
    // so the tool result is an error string the model then relays.
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "available_slots",
                            "arguments": "{\"service\":\"Hydrafacial\",\"date\":\"tomorrow\"}"
                        }
                    }]
                }
            }]
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "I couldn't reach the calendar right now, please call us to book."
                }
            }]
        })))
        .mount(&mock_server)
        .await;

    let state = Arc::new(test_config(&mock_server.uri()));
    let Json(response) = handlers::chat(State(state), Json(chat_request("Book me a hydrafacial tomorrow")))
        .await
        .unwrap();

    assert!(response.response.contains("calendar"));
    assert!(response.error.is_none());
}

#[tokio::test]
async fn test_empty_message_short_circuits() {
    // No mocks mounted: an empty message must not touch any backend.
    let state = Arc::new(test_config("http://localhost:0"));

    let Json(response) = handlers::chat(State(state), Json(chat_request("   ")))
        .await
        .unwrap();

    assert!(response.response.contains("I'm here to help"));
    assert_eq!(response.session_id, "");
    assert_eq!(response.user_id, "");
}

#[tokio::test]
async fn test_unknown_clinic_is_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let state = Arc::new(test_config(&mock_server.uri()));
    let err = handlers::chat(State(state), Json(chat_request("hello")))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_openai_failure_becomes_apology() {
    let mock_server = MockServer::start().await;
    let user_id = Uuid::new_v4();
    let clinic_uuid = Uuid::new_v4();
    let session_id = Uuid::new_v4();

    mount_supabase(&mock_server, user_id, clinic_uuid, session_id).await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .mount(&mock_server)
        .await;

    let state = Arc::new(test_config(&mock_server.uri()));
    let Json(response) = handlers::chat(State(state), Json(chat_request("hello")))
        .await
        .unwrap();

    assert!(response.response.contains("I'm sorry"));
    assert!(response.error.as_deref().unwrap_or("").contains("429"));
}
