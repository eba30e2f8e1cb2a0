/// Verifier endpoints
///
/// Both return `{valid, reason?, claims?}` with status 200 for any token,
/// good or bad. Only infrastructure failures produce an error status.
use crate::{context::AppContext, credential::TrustVerdict, error::VcResult};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

/// Build verifier routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/verifier/verify", post(verify))
        .route("/verifier/scan", get(scan))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanParams {
    pub jti: String,
}

/// POST /verifier/verify
pub async fn verify(
    State(ctx): State<AppContext>,
    Json(request): Json<VerifyRequest>,
) -> VcResult<Json<TrustVerdict>> {
    let policy = ctx.trust_policy();
    let verdict = ctx.composer.check_trust(request.token.trim(), &policy).await?;

    Ok(Json(verdict))
}

/// GET /verifier/scan?jti=
pub async fn scan(
    State(ctx): State<AppContext>,
    Query(params): Query<ScanParams>,
) -> VcResult<Json<TrustVerdict>> {
    let policy = ctx.trust_policy();
    let verdict = ctx
        .composer
        .check_trust_by_token_id(&params.jti, &policy)
        .await?;

    Ok(Json(verdict))
}
