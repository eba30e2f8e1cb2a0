/// did:web key resolution
///
/// Fetches issuer DID documents over HTTPS, extracts the assertion key and
/// keeps it in a process-lifetime cache.

pub mod cache;
pub mod document;
pub mod fetch;
pub mod resolver;

pub use cache::{InMemoryKeyCache, KeyCache};
pub use document::{DidDocument, VerificationMethod};
pub use fetch::{DocumentFetcher, FetchError, HttpsDocumentFetcher};
pub use resolver::{did_web_to_url, is_did_web, DidWebResolver};

use jsonwebtoken::DecodingKey;
use std::fmt;
use thiserror::Error;

/// Result of a resolution attempt; failures are never raised past the resolver
#[derive(Clone)]
pub enum ResolutionOutcome {
    Resolved(DecodingKey),
    Unresolved,
}

impl ResolutionOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionOutcome::Resolved(_))
    }

    pub fn into_key(self) -> Option<DecodingKey> {
        match self {
            ResolutionOutcome::Resolved(key) => Some(key),
            ResolutionOutcome::Unresolved => None,
        }
    }
}

impl fmt::Debug for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionOutcome::Resolved(_) => f.write_str("Resolved(..)"),
            ResolutionOutcome::Unresolved => f.write_str("Unresolved"),
        }
    }
}

/// Why a resolution attempt collapsed to `Unresolved`
///
/// Logged and counted only; callers see a bare `Unresolved`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    #[error("issuer is not a did:web identifier")]
    NotDidWeb,

    #[error("document fetch failed: {0}")]
    Fetch(String),

    #[error("malformed DID document: {0}")]
    MalformedDocument(String),

    #[error("DID document has no assertionMethod")]
    NoAssertionMethod,

    #[error("verification method {0} not found")]
    VerificationMethodNotFound(String),

    #[error("unsupported key type {0}")]
    UnsupportedKeyType(String),

    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),
}

impl ResolveFailure {
    pub fn label(&self) -> &'static str {
        match self {
            ResolveFailure::NotDidWeb => "not_did_web",
            ResolveFailure::Fetch(_) => "fetch",
            ResolveFailure::MalformedDocument(_) => "malformed_document",
            ResolveFailure::NoAssertionMethod => "no_assertion_method",
            ResolveFailure::VerificationMethodNotFound(_) => "verification_method_not_found",
            ResolveFailure::UnsupportedKeyType(_) => "unsupported_key_type",
            ResolveFailure::InvalidKeyMaterial(_) => "invalid_key_material",
        }
    }
}
