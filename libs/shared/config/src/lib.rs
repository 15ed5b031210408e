use std::env;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub openai_api_key: String,
    pub openai_model: String,
    pub openai_api_base: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
    pub google_credentials_file: String,
    pub google_calendar_api_base: String,
    pub default_timezone: String,
    pub default_start_hour: u32,
    pub default_end_hour: u32,
    pub default_appointment_minutes: i64,
    pub api_host: String,
    pub api_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY")
            .unwrap_or_else(|_| {
                warn!("SUPABASE_ANON_KEY not set, using empty value");
                String::new()
            });

        let config = Self {
            openai_api_key: env::var("OPENAI_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("OPENAI_API_KEY not set, using empty value");
                    String::new()
                }),
            openai_model: env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o".to_string()),
            openai_api_base: env::var("OPENAI_API_BASE")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            // Server-side queries prefer the service key; a dev setup with
            // only the anon key still works.
            supabase_service_key: env::var("SUPABASE_SERVICE_KEY")
                .unwrap_or_else(|_| supabase_anon_key.clone()),
            supabase_anon_key,
            google_credentials_file: env::var("GOOGLE_CALENDAR_CREDENTIALS_FILE")
                .unwrap_or_else(|_| "credentials/google-credentials.json".to_string()),
            google_calendar_api_base: env::var("GOOGLE_CALENDAR_API_BASE")
                .unwrap_or_else(|_| "https://www.googleapis.com/calendar/v3".to_string()),
            default_timezone: env::var("DEFAULT_TIMEZONE")
                .unwrap_or_else(|_| "Asia/Karachi".to_string()),
            default_start_hour: parse_env("DEFAULT_START_HOUR", 9),
            default_end_hour: parse_env("DEFAULT_END_HOUR", 19),
            default_appointment_minutes: parse_env("DEFAULT_APPOINTMENT_DURATION", 30),
            api_host: env::var("API_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parse_env("API_PORT", 8000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.openai_api_key.is_empty()
            && !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
    }

    pub fn is_calendar_configured(&self) -> bool {
        Path::new(&self.google_credentials_file).exists()
    }
}

fn parse_env<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}
