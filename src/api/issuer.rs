/// Issuer endpoints: issue, revoke, list and inspect credentials
use crate::{
    context::AppContext,
    error::VcResult,
    issuer::{CredentialDetail, CredentialSummary, IssueRequest, IssuedCredential},
};
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};

/// Build issuer routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/issuer/issue", post(issue))
        .route("/issuer/revoke", post(revoke))
        .route("/issuer/list", get(list))
        .route("/issuer/detail", get(detail))
}

#[derive(Debug, Deserialize)]
pub struct RevokeRequest {
    pub jti: String,
    #[serde(default, alias = "reason")]
    pub note: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub ok: bool,
    pub jti: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub subject: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DetailParams {
    pub jti: String,
}

/// POST /issuer/issue
pub async fn issue(
    State(ctx): State<AppContext>,
    Json(request): Json<IssueRequest>,
) -> VcResult<Json<IssuedCredential>> {
    Ok(Json(ctx.issuer.issue(request).await?))
}

/// POST /issuer/revoke
pub async fn revoke(
    State(ctx): State<AppContext>,
    Json(request): Json<RevokeRequest>,
) -> VcResult<Json<RevokeResponse>> {
    let record = ctx
        .issuer
        .revoke(&request.jti, request.note.as_deref())
        .await?;

    Ok(Json(RevokeResponse {
        ok: true,
        jti: record.jti,
        status: record.status.to_string(),
    }))
}

/// GET /issuer/list
pub async fn list(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> VcResult<Json<Vec<CredentialSummary>>> {
    Ok(Json(ctx.issuer.list(params.subject.as_deref()).await?))
}

/// GET /issuer/detail?jti=
pub async fn detail(
    State(ctx): State<AppContext>,
    Query(params): Query<DetailParams>,
) -> VcResult<Json<CredentialDetail>> {
    Ok(Json(ctx.issuer.detail(&params.jti).await?))
}
