/// Holder endpoints: credential listing and shareable verification links
use crate::{
    context::AppContext,
    error::{VcError, VcResult},
    issuer::CredentialSummary,
};
use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

/// Build holder routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/holder/credentials", get(list_credentials))
        .route("/holder/link/:jti", get(verify_link))
}

#[derive(Debug, Deserialize)]
pub struct CredentialsParams {
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyLink {
    pub jti: String,
    pub verify_url: String,
}

/// GET /holder/credentials
pub async fn list_credentials(
    State(ctx): State<AppContext>,
    Query(params): Query<CredentialsParams>,
) -> VcResult<Json<Vec<CredentialSummary>>> {
    Ok(Json(ctx.issuer.list(params.subject.as_deref()).await?))
}

/// GET /holder/link/:jti
///
/// The URL a QR code or share button would carry.
pub async fn verify_link(
    State(ctx): State<AppContext>,
    Path(jti): Path<String>,
) -> VcResult<Json<VerifyLink>> {
    if !ctx.issuer.exists(&jti).await? {
        return Err(VcError::NotFound(format!("Credential {} not found", jti)));
    }

    Ok(Json(VerifyLink {
        verify_url: ctx.verify_url(&jti),
        jti,
    }))
}
