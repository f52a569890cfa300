use crate::{FhonkError, router::FhonkState};
use axum::{Json, extract::State};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
pub struct DeveloperTokenResponse {
    pub developer_token: String,
}

/// GET /api/v1/auth/apple -> a freshly signed Apple Music developer token.
pub async fn developer_token(
    State(state): State<FhonkState>,
) -> Result<Json<DeveloperTokenResponse>, FhonkError> {
    let signer = state.apple.as_ref().ok_or_else(|| {
        FhonkError::DeveloperTokenUnavailable("Apple Music signing key not configured".to_string())
    })?;
    let developer_token = signer.sign()?;
    info!("Issued Apple Music developer token");
    Ok(Json(DeveloperTokenResponse { developer_token }))
}
