//! GET /me - the admitted principal, as seen by the gateway.

use crate::error::{GatewayError, GatewayResult};
use axum::{Extension, Json};
use pidima_kernel::gateway::{AdmissionContext, AuthError};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub name: String,
    pub authorities: Vec<String>,
}

pub async fn me(Extension(ctx): Extension<AdmissionContext>) -> GatewayResult<Json<MeResponse>> {
    let principal = ctx
        .principal
        .ok_or(GatewayError::Auth(AuthError::MissingCredential))?;
    Ok(Json(MeResponse {
        name: principal.subject,
        authorities: principal.capabilities.into_iter().collect(),
    }))
}
