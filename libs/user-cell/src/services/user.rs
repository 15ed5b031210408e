use anyhow::{Result, anyhow};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::User;

pub struct UserService {
    supabase: SupabaseClient,
}

impl UserService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Look the user up by (phone, clinic); create them on first contact.
    /// Every hit refreshes `last_active`, and a name supplied later fills a
    /// previously anonymous record.
    pub async fn get_or_create(
        &self,
        phone_number: &str,
        clinic_uuid: Uuid,
        name: Option<&str>,
    ) -> Result<User> {
        let path = format!(
            "/rest/v1/users?phone_number=eq.{}&clinic_id=eq.{}",
            urlencoding::encode(phone_number),
            clinic_uuid
        );
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Prefer", reqwest::header::HeaderValue::from_static("return=representation"));

        if let Some(row) = rows.into_iter().next() {
            let existing: User = serde_json::from_value(row)?;
            debug!("Found existing user {} for {}", existing.id, phone_number);

            let update = json!({
                "last_active": Utc::now().to_rfc3339(),
                "name": name.map(str::to_string).or(existing.name.clone()),
            });
            let patch_path = format!("/rest/v1/users?id=eq.{}", existing.id);
            let updated: Vec<Value> = self.supabase.request_with_headers(
                Method::PATCH,
                &patch_path,
                None,
                Some(update),
                Some(headers),
            ).await?;

            return match updated.into_iter().next() {
                Some(row) => Ok(serde_json::from_value(row)?),
                None => Ok(existing),
            };
        }

        let new_user = json!({
            "phone_number": phone_number,
            "clinic_id": clinic_uuid,
            "name": name,
            "last_active": Utc::now().to_rfc3339(),
        });

        let created: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/users",
            None,
            Some(new_user),
            Some(headers),
        ).await?;

        let row = created.into_iter().next()
            .ok_or_else(|| anyhow!("Failed to create user"))?;

        debug!("Created new user for {}", phone_number);
        Ok(serde_json::from_value(row)?)
    }
}
