/// API routes and handlers
pub mod holder;
pub mod issuer;
pub mod verifier;
pub mod well_known;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes(issuer_did: &str) -> Router<AppContext> {
    Router::new()
        .merge(well_known::routes(issuer_did))
        .merge(issuer::routes())
        .merge(verifier::routes())
        .merge(holder::routes())
}
