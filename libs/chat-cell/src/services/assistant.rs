// libs/chat-cell/src/services/assistant.rs
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, info, warn};

use clinic_cell::models::{ClinicDirectory, ClinicError};
use clinic_cell::services::clinic::ClinicService;
use scheduling_cell::services::availability::AvailabilityService;
use scheduling_cell::services::booking::{self, BookingService};
use scheduling_cell::services::google_calendar::GoogleCalendarClient;
use shared_config::AppConfig;
use user_cell::models::User;
use user_cell::services::session::{SessionService, HISTORY_LIMIT};
use user_cell::services::user::UserService;

use crate::models::{ChatError, ChatMessage, ChatRequest, ChatResponse, ToolCall};
use crate::prompt;
use crate::services::openai::OpenAiService;

/// Upper bound on assistant tool-call rounds in one turn. Chained tool use
/// (check slots, then book) converges well below this.
const MAX_TOOL_ROUNDS: usize = 3;

/// Drives one conversation turn end to end: directory lookup, user and
/// session management, the model/tool loop, and persistence.
pub struct AssistantService {
    clinics: ClinicService,
    users: UserService,
    sessions: SessionService,
    openai: OpenAiService,
    availability: AvailabilityService,
    booking: BookingService,
    default_timezone: String,
}

impl AssistantService {
    pub fn new(config: &AppConfig) -> Self {
        let calendar = Arc::new(GoogleCalendarClient::new(config));

        Self {
            clinics: ClinicService::new(config),
            users: UserService::new(config),
            sessions: SessionService::new(config),
            openai: OpenAiService::new(config),
            availability: AvailabilityService::new(config, Arc::clone(&calendar)),
            booking: BookingService::new(config, calendar),
            default_timezone: config.default_timezone.clone(),
        }
    }

    pub async fn handle_message(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let user_input = request.message.trim();

        let directory = self.clinics.get_directory(&request.clinic_id).await
            .map_err(|e| match e {
                ClinicError::NotFound(slug) => ChatError::ClinicNotFound(slug),
                ClinicError::Database(msg) => ChatError::Database(msg),
            })?;
        let clinic_uuid = directory.clinic.id;

        let user = self.users
            .get_or_create(&request.phone_number, clinic_uuid, request.user_name.as_deref())
            .await
            .map_err(|e| ChatError::User(e.to_string()))?;

        let session = self.sessions.get_or_create_session(user.id, clinic_uuid).await
            .map_err(|e| ChatError::Session(e.to_string()))?;

        let mut history = self.sessions.load_history(session.id, HISTORY_LIMIT).await
            .map_err(|e| ChatError::Database(e.to_string()))?;

        let user_message = ChatMessage::user(user_input);
        history.push(user_message.clone());
        self.persist(session.id, user.id, clinic_uuid, &user_message).await;

        let now = Utc::now();
        let today = clinic_today(&directory, &self.default_timezone, now);
        let system_prompt = prompt::build_system_prompt(&directory, today);

        let mut turn = self.openai.chat_with_tools(&system_prompt, &history).await?;
        let mut rounds = 0;

        while !turn.tool_calls.is_empty() && rounds < MAX_TOOL_ROUNDS {
            rounds += 1;
            debug!("Tool round {} with {} calls", rounds, turn.tool_calls.len());

            let assistant_message =
                ChatMessage::assistant_with_tools(turn.content.clone(), turn.tool_calls.clone());
            history.push(assistant_message.clone());
            self.persist(session.id, user.id, clinic_uuid, &assistant_message).await;

            for call in &turn.tool_calls {
                let result = self
                    .execute_tool(&directory, &user, call, &request.phone_number, today, now)
                    .await;

                let tool_message = ChatMessage::tool(&call.id, &call.function.name, result);
                history.push(tool_message.clone());
                self.persist(session.id, user.id, clinic_uuid, &tool_message).await;
            }

            turn = self.openai.chat_with_tools(&system_prompt, &history).await?;
        }

        let content = turn.content.unwrap_or_else(|| {
            warn!("Model returned no text after {} tool rounds", rounds);
            "I'm sorry, I couldn't complete that request. Please try again.".to_string()
        });

        let final_message = ChatMessage::assistant(&content);
        history.push(final_message.clone());
        self.persist(session.id, user.id, clinic_uuid, &final_message).await;

        if let Err(e) = self.sessions.update_session_backup(session.id, &history).await {
            warn!("Failed to update session backup: {}", e);
        }

        Ok(ChatResponse {
            response: content,
            session_id: session.id.to_string(),
            user_id: user.id.to_string(),
            clinic_name: directory.clinic.clinic_name.clone(),
            error: None,
        })
    }

    /// Execute one tool call. Failures become the tool result string so the
    /// model can relay them; the turn itself never aborts here.
    async fn execute_tool(
        &self,
        directory: &ClinicDirectory,
        user: &User,
        call: &ToolCall,
        fallback_phone: &str,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> String {
        let args: Value = match serde_json::from_str(&call.function.arguments) {
            Ok(args) => args,
            Err(e) => return format!("Error executing function: invalid arguments ({})", e),
        };

        match call.function.name.as_str() {
            "available_slots" => {
                let Some(service) = args["service"].as_str() else {
                    return "Error executing function: missing 'service' argument".to_string();
                };
                let date = normalize_slot_date(args["date"].as_str().unwrap_or("today"), today);

                info!("Checking available slots for '{}' on {}", service, date);

                match self.availability.available_slots(directory, service, date, now).await {
                    Ok(slots) => {
                        let formatted: Vec<String> = slots.iter()
                            .map(|slot| format!("{} {}", date, slot.formatted_time_only))
                            .collect();
                        serde_json::to_string(&formatted)
                            .unwrap_or_else(|_| "[]".to_string())
                    }
                    Err(e) => format!("Error executing function: {}", e),
                }
            }
            "book_appointment" => {
                let Some(service) = args["service"].as_str() else {
                    return "Error executing function: missing 'service' argument".to_string();
                };
                let Some(patient_name) = args["patient_name"].as_str() else {
                    return "Error executing function: missing 'patient_name' argument".to_string();
                };
                let Some(slot) = args["slot"].as_str() else {
                    return "Error executing function: missing 'slot' argument".to_string();
                };
                let patient_phone = args["patient_phone"].as_str().unwrap_or(fallback_phone);

                info!("Booking appointment for '{}' at {}", service, slot);

                match self.booking.book(directory, service, patient_name, patient_phone, slot).await {
                    Ok(confirmation) => {
                        if let Err(e) = self.booking
                            .record_appointment(user.id, directory.clinic.id, &confirmation, patient_name, patient_phone)
                            .await
                        {
                            warn!("Booked event {} but failed to save appointment row: {}", confirmation.event_id, e);
                        }
                        booking::confirmation_message(directory, &confirmation, patient_name)
                    }
                    Err(e) => booking::failure_message(directory, &e),
                }
            }
            other => {
                warn!("Model requested unknown function '{}'", other);
                "Unknown function".to_string()
            }
        }
    }

    async fn persist(&self, session_id: uuid::Uuid, user_id: uuid::Uuid, clinic_uuid: uuid::Uuid, message: &ChatMessage) {
        if let Err(e) = self.sessions.save_message(session_id, user_id, clinic_uuid, message).await {
            warn!("Failed to save {} message: {}", message.role, e);
        }
    }
}

fn clinic_today(directory: &ClinicDirectory, default_tz: &str, now: DateTime<Utc>) -> NaiveDate {
    let tz: Tz = directory.clinic.timezone.parse()
        .or_else(|_| default_tz.parse())
        .unwrap_or(chrono_tz::UTC);
    now.with_timezone(&tz).date_naive()
}

/// Normalize the model's `date` argument: relative keywords resolve against
/// the clinic's today, and past, ancient or unparseable dates clamp to
/// today rather than failing the lookup.
pub fn normalize_slot_date(raw: &str, today: NaiveDate) -> NaiveDate {
    let cleaned = raw.trim().to_lowercase();

    match cleaned.as_str() {
        "today" => today,
        "tomorrow" => today + Duration::days(1),
        _ => match cleaned.parse::<NaiveDate>() {
            Ok(date) if date < today - Duration::days(365) => {
                warn!("Ancient date {} requested, using today", date);
                today
            }
            Ok(date) if date < today => {
                warn!("Past date {} requested, using today", date);
                today
            }
            Ok(date) => date,
            Err(_) => {
                warn!("Unparseable date '{}', using today", raw);
                today
            }
        },
    }
}
