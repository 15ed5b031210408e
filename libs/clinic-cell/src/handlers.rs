use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{Clinic, ClinicInfo, ClinicServicesResponse, ClinicSummary, CreateClinicRequest};
use crate::services::{catalog, clinic::ClinicService};

#[axum::debug_handler]
pub async fn list_clinics(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Vec<ClinicSummary>>, AppError> {
    let clinic_service = ClinicService::new(&state);

    let clinics = clinic_service.list_clinics().await?;

    Ok(Json(clinics))
}

#[axum::debug_handler]
pub async fn create_clinic(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<Json<Clinic>, AppError> {
    let clinic_service = ClinicService::new(&state);

    let clinic = clinic_service.create_clinic(request).await?;

    Ok(Json(clinic))
}

#[axum::debug_handler]
pub async fn get_clinic_services(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<String>,
) -> Result<Json<ClinicServicesResponse>, AppError> {
    let clinic_service = ClinicService::new(&state);

    let directory = clinic_service.get_directory(&clinic_id).await?;
    let services = catalog::service_catalog(&directory);

    Ok(Json(ClinicServicesResponse {
        services,
        clinic_info: ClinicInfo {
            name: directory.clinic.clinic_name.clone(),
            timezone: directory.clinic.timezone.clone(),
            address: directory.clinic.address.clone(),
            phone: directory.clinic.phone.clone(),
        },
    }))
}
