/// Well-known endpoints
/// Publishes the issuer DID document so did:web verifiers can resolve it
use crate::{
    context::AppContext,
    crypto::{
        jwk::rsa_public_jwk,
        keys::{KeyFamily, KeyMaterial},
    },
    error::{VcError, VcResult},
    identity::{did_web_to_url, DidDocument},
};
use axum::{extract::State, http::Uri, response::Json, routing::get, Router};

const WELL_KNOWN_PATH: &str = "/.well-known/did.json";

/// Build well-known routes
///
/// A path-form did:web issuer (`did:web:host:users:alice`) is resolved from
/// `/users/alice/did.json`, so that path is routed as well.
pub fn routes(issuer_did: &str) -> Router<AppContext> {
    let router = Router::new().route(WELL_KNOWN_PATH, get(did_document));

    match document_path(issuer_did) {
        Some(path) if path != WELL_KNOWN_PATH && !path.contains('*') => {
            router.route(&path, get(did_document))
        }
        _ => router,
    }
}

/// Path on this host a resolver fetches the issuer's document from
pub fn document_path(did: &str) -> Option<String> {
    let url = did_web_to_url(did)?;
    let rest = url.strip_prefix("https://")?;
    rest.find('/').map(|idx| rest[idx..].to_string())
}

/// GET the issuer DID document
///
/// One JsonWebKey2020 method, `<did>#keys-1`, referenced from
/// assertionMethod. Only served when the issuer is a did:web identifier
/// with an RSA key, and only at the path its DID maps to.
pub async fn did_document(
    State(ctx): State<AppContext>,
    uri: Uri,
) -> VcResult<Json<DidDocument>> {
    let did = ctx.issuer_did();
    match document_path(did) {
        None => {
            return Err(VcError::NotFound(
                "Issuer is not a did:web identifier".to_string(),
            ))
        }
        Some(path) if path != uri.path() => {
            return Err(VcError::NotFound(format!(
                "Issuer DID document is published at {}",
                path
            )))
        }
        Some(_) => {}
    }

    if KeyFamily::for_algorithm(ctx.keys.algorithm())? != KeyFamily::Rsa {
        return Err(VcError::NotFound(
            "No RSA verification key to publish".to_string(),
        ));
    }

    let pem = ctx.keys.read_public_pem()?;
    let jwk = rsa_public_jwk(&pem)
        .map_err(|e| VcError::Internal(format!("Failed to encode public key: {}", e)))?;

    Ok(Json(DidDocument::for_rsa_issuer(did, jwk)))
}
