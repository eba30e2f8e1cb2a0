/// Trust policy: picks the public key source for an issuer
///
/// did:web resolution is preferred when enabled; the static PEM key is the
/// fallback. The policy is passed on every call, never read from ambient
/// state, so concurrent requests with different policies do not interfere.
use crate::{
    crypto::keys::{KeyLoadError, KeyMaterial},
    identity::{is_did_web, DidWebResolver, ResolutionOutcome},
};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use std::{fmt, sync::Arc};
use thiserror::Error;

/// Which key sources a verification may consult
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustPolicy {
    pub use_did_web: bool,
    pub allow_static_fallback: bool,
}

impl TrustPolicy {
    pub fn static_only() -> Self {
        Self {
            use_did_web: false,
            allow_static_fallback: true,
        }
    }

    pub fn did_web_only() -> Self {
        Self {
            use_did_web: true,
            allow_static_fallback: false,
        }
    }
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            use_did_web: true,
            allow_static_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    DidWeb,
    StaticPem,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::DidWeb => "did_web",
            KeySource::StaticPem => "static_pem",
        }
    }
}

/// A verification key together with where it came from
#[derive(Clone)]
pub struct PublicKeyMaterial {
    pub key: DecodingKey,
    pub source: KeySource,
}

impl fmt::Debug for PublicKeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyMaterial")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

#[derive(Error, Debug)]
pub enum TrustError {
    #[error("no public key available for issuer")]
    NoKeyAvailable,

    #[error(transparent)]
    KeyLoad(#[from] KeyLoadError),
}

/// Applies a [`TrustPolicy`] over the did:web resolver and the static key
#[derive(Clone)]
pub struct TrustPolicyEngine {
    resolver: Arc<DidWebResolver>,
    keys: Arc<dyn KeyMaterial>,
}

impl TrustPolicyEngine {
    pub fn new(resolver: Arc<DidWebResolver>, keys: Arc<dyn KeyMaterial>) -> Self {
        Self { resolver, keys }
    }

    /// Signature algorithm of the configured key pair
    pub fn algorithm(&self) -> jsonwebtoken::Algorithm {
        self.keys.algorithm()
    }

    /// The static key, when the policy lets it be used
    ///
    /// Used for tokens whose issuer cannot be read at all, so there is no
    /// DID to resolve.
    pub fn static_key(&self, policy: &TrustPolicy) -> Result<Option<DecodingKey>, KeyLoadError> {
        if !policy.allow_static_fallback {
            return Ok(None);
        }
        self.keys.load_public_key().map(Some)
    }

    /// Resolve the key used to verify tokens from `issuer`
    ///
    /// Order: did:web (when enabled and the issuer has that form), then the
    /// static key (when fallback is allowed), otherwise `NoKeyAvailable`.
    /// A did:web hit returns without touching the static key.
    pub async fn resolve_public_key_for(
        &self,
        issuer: &str,
        policy: &TrustPolicy,
    ) -> Result<PublicKeyMaterial, TrustError> {
        if policy.use_did_web && is_did_web(issuer) {
            if let ResolutionOutcome::Resolved(key) = self.resolver.resolve(issuer).await {
                return Ok(PublicKeyMaterial {
                    key,
                    source: KeySource::DidWeb,
                });
            }
            tracing::debug!("did:web key for {} unavailable, applying fallback policy", issuer);
        }

        if policy.allow_static_fallback {
            let key = self.keys.load_public_key()?;
            return Ok(PublicKeyMaterial {
                key,
                source: KeySource::StaticPem,
            });
        }

        tracing::warn!("No public key available for issuer {}", issuer);
        Err(TrustError::NoKeyAvailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::{tests::issuer_keys, PemKeyProvider};
    use crate::identity::resolver::tests::{issuer_document, ScriptedFetcher};
    use crate::identity::{FetchError, InMemoryKeyCache};
    use jsonwebtoken::Algorithm;

    const DID: &str = "did:web:issuer.test";

    fn engine(fetcher: Arc<ScriptedFetcher>, keys: PemKeyProvider) -> TrustPolicyEngine {
        let resolver = DidWebResolver::new(Arc::new(InMemoryKeyCache::new()), fetcher);
        TrustPolicyEngine::new(Arc::new(resolver), Arc::new(keys))
    }

    fn missing_keys() -> PemKeyProvider {
        PemKeyProvider::new(Algorithm::RS256, "/nonexistent/private.pem", "/nonexistent/public.pem")
    }

    #[tokio::test]
    async fn test_failed_resolution_falls_back_to_static_key() {
        let fetcher = Arc::new(ScriptedFetcher::failing(FetchError::Network("unreachable".into())));
        let engine = engine(fetcher.clone(), issuer_keys());

        let material = engine
            .resolve_public_key_for(DID, &TrustPolicy::default())
            .await
            .unwrap();

        assert_eq!(material.source, KeySource::StaticPem);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_strict_policy_without_fallback() {
        let fetcher = Arc::new(ScriptedFetcher::failing(FetchError::Timeout));
        let engine = engine(fetcher, issuer_keys());

        let result = engine
            .resolve_public_key_for(DID, &TrustPolicy::did_web_only())
            .await;

        assert!(matches!(result, Err(TrustError::NoKeyAvailable)));
    }

    #[tokio::test]
    async fn test_resolved_key_skips_static_source() {
        // Static key files do not exist; a did:web hit must never read them
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document(DID)));
        let engine = engine(fetcher, missing_keys());

        let material = engine
            .resolve_public_key_for(DID, &TrustPolicy::default())
            .await
            .unwrap();

        assert_eq!(material.source, KeySource::DidWeb);
    }

    #[tokio::test]
    async fn test_did_web_disabled_uses_static_without_network() {
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document(DID)));
        let engine = engine(fetcher.clone(), issuer_keys());

        let material = engine
            .resolve_public_key_for(DID, &TrustPolicy::static_only())
            .await
            .unwrap();

        assert_eq!(material.source, KeySource::StaticPem);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_did_web_issuer_uses_static_key() {
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document(DID)));
        let engine = engine(fetcher.clone(), issuer_keys());

        let material = engine
            .resolve_public_key_for("did:example:issuer", &TrustPolicy::default())
            .await
            .unwrap();

        assert_eq!(material.source, KeySource::StaticPem);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_both_sources_disabled() {
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document(DID)));
        let engine = engine(fetcher, issuer_keys());
        let policy = TrustPolicy {
            use_did_web: false,
            allow_static_fallback: false,
        };

        let result = engine.resolve_public_key_for(DID, &policy).await;
        assert!(matches!(result, Err(TrustError::NoKeyAvailable)));
    }

    #[tokio::test]
    async fn test_unreadable_static_key_is_an_error_not_a_verdict() {
        let fetcher = Arc::new(ScriptedFetcher::failing(FetchError::Timeout));
        let engine = engine(fetcher, missing_keys());

        let result = engine
            .resolve_public_key_for(DID, &TrustPolicy::default())
            .await;

        assert!(matches!(result, Err(TrustError::KeyLoad(_))));
    }
}
