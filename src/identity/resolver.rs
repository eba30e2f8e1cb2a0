/// did:web resolver - derives the document URL, fetches it, extracts the
/// assertion key and caches it for the life of the process
use crate::{
    identity::{DidDocument, DocumentFetcher, KeyCache, ResolutionOutcome, ResolveFailure},
    metrics,
};
use jsonwebtoken::DecodingKey;
use std::sync::Arc;

const DID_WEB_PREFIX: &str = "did:web:";

/// Whether `issuer` has the did:web form this resolver understands
pub fn is_did_web(issuer: &str) -> bool {
    did_web_to_url(issuer).is_some()
}

/// Map a did:web identifier to its document URL
///
/// did:web:example.org              -> https://example.org/.well-known/did.json
/// did:web:example.org:users:alice  -> https://example.org/users/alice/did.json
/// did:web:localhost%3A8443         -> https://localhost:8443/.well-known/did.json
pub fn did_web_to_url(issuer: &str) -> Option<String> {
    let rest = issuer.strip_prefix(DID_WEB_PREFIX)?;
    let mut segments = rest.split(':');

    let host = segments.next()?.replace("%3A", ":").replace("%3a", ":");
    if host.is_empty() || has_reserved_chars(&host) {
        return None;
    }

    let path: Vec<&str> = segments.collect();
    if path.iter().any(|s| s.is_empty() || has_reserved_chars(s)) {
        return None;
    }

    if path.is_empty() {
        Some(format!("https://{}/.well-known/did.json", host))
    } else {
        Some(format!("https://{}/{}/did.json", host, path.join("/")))
    }
}

fn has_reserved_chars(segment: &str) -> bool {
    segment.contains(|c: char| matches!(c, '/' | '?' | '#' | '@') || c.is_whitespace())
}

/// Resolves issuer DIDs of the did:web form to RSA verification keys
#[derive(Clone)]
pub struct DidWebResolver {
    cache: Arc<dyn KeyCache>,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl DidWebResolver {
    pub fn new(cache: Arc<dyn KeyCache>, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Resolve the assertion key for `issuer`
    ///
    /// Every failure collapses to `Unresolved`. No lock is held while the
    /// document is being fetched.
    pub async fn resolve(&self, issuer: &str) -> ResolutionOutcome {
        let Some(url) = did_web_to_url(issuer) else {
            tracing::debug!("Skipping did:web resolution for {}: {}", issuer, ResolveFailure::NotDidWeb);
            return ResolutionOutcome::Unresolved;
        };

        if let Some(key) = self.cache.get(issuer).await {
            metrics::record_did_web_resolution("cache_hit");
            return ResolutionOutcome::Resolved(key);
        }

        match self.fetch_assertion_key(issuer, &url).await {
            Ok(key) => {
                self.cache.insert(issuer, key.clone()).await;
                metrics::record_did_web_resolution("resolved");
                tracing::info!("Resolved did:web key for {} from {}", issuer, url);
                ResolutionOutcome::Resolved(key)
            }
            Err(failure) => {
                metrics::record_did_web_resolution("unresolved");
                tracing::warn!(
                    issuer = %issuer,
                    url = %url,
                    category = failure.label(),
                    "did:web resolution failed: {}",
                    failure
                );
                ResolutionOutcome::Unresolved
            }
        }
    }

    async fn fetch_assertion_key(&self, issuer: &str, url: &str) -> Result<DecodingKey, ResolveFailure> {
        let value = self
            .fetcher
            .fetch_json(url)
            .await
            .map_err(|e| ResolveFailure::Fetch(e.to_string()))?;

        let document = DidDocument::from_json(value)?;
        if !document.id.is_empty() && document.id != issuer {
            return Err(ResolveFailure::MalformedDocument(format!(
                "document id {} does not match {}",
                document.id, issuer
            )));
        }

        document.assertion_key()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crypto::jwk::rsa_public_jwk;
    use crate::crypto::keys::tests::issuer_keys;
    use crate::identity::{FetchError, InMemoryKeyCache};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fetcher answering every request with the same scripted result
    pub(crate) struct ScriptedFetcher {
        response: Result<serde_json::Value, FetchError>,
        calls: AtomicUsize,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        pub(crate) fn document(doc: serde_json::Value) -> Self {
            Self {
                response: Ok(doc),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(err: FetchError) -> Self {
            Self {
                response: Err(err),
                calls: AtomicUsize::new(0),
                urls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub(crate) fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentFetcher for ScriptedFetcher {
        async fn fetch_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            self.response.clone()
        }
    }

    /// DID document publishing the issuer fixture key
    pub(crate) fn issuer_document(did: &str) -> serde_json::Value {
        let pem = issuer_keys().read_public_pem().unwrap();
        let jwk = rsa_public_jwk(&pem).unwrap();
        serde_json::to_value(DidDocument::for_rsa_issuer(did, jwk)).unwrap()
    }

    fn resolver(fetcher: Arc<ScriptedFetcher>) -> DidWebResolver {
        DidWebResolver::new(Arc::new(InMemoryKeyCache::new()), fetcher)
    }

    #[test]
    fn test_did_web_to_url() {
        assert_eq!(
            did_web_to_url("did:web:example.org").as_deref(),
            Some("https://example.org/.well-known/did.json")
        );
        assert_eq!(
            did_web_to_url("did:web:example.org:users:alice").as_deref(),
            Some("https://example.org/users/alice/did.json")
        );
        assert_eq!(
            did_web_to_url("did:web:localhost%3A8443").as_deref(),
            Some("https://localhost:8443/.well-known/did.json")
        );
    }

    #[test]
    fn test_non_did_web_forms() {
        assert!(!is_did_web("did:example:issuer"));
        assert!(!is_did_web("did:plc:abc123"));
        assert!(!is_did_web("did:web:"));
        assert!(!is_did_web("did:web:example.org:"));
        assert!(!is_did_web("did:web:evil.org/path"));
        assert!(!is_did_web("did:web:user@evil.org"));
        assert!(!is_did_web(""));
    }

    #[tokio::test]
    async fn test_resolve_and_cache() {
        let did = "did:web:issuer.test";
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document(did)));
        let resolver = resolver(fetcher.clone());

        assert!(resolver.resolve(did).await.is_resolved());
        assert!(resolver.resolve(did).await.is_resolved());

        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            fetcher.urls(),
            vec!["https://issuer.test/.well-known/did.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_resolved_key_verifies_issuer_signature() {
        use jsonwebtoken::{decode, encode, Algorithm, Header, Validation};
        use crate::crypto::keys::KeyMaterial;

        let did = "did:web:issuer.test";
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document(did)));
        let key = resolver(fetcher).resolve(did).await.into_key().unwrap();

        let claims = serde_json::json!({"iss": did, "exp": 4_000_000_000u64});
        let token = encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &issuer_keys().load_private_key().unwrap(),
        )
        .unwrap();

        let decoded = decode::<serde_json::Value>(&token, &key, &Validation::new(Algorithm::RS256));
        assert!(decoded.is_ok());
    }

    #[tokio::test]
    async fn test_non_did_web_issuer_makes_no_network_call() {
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document("did:web:x")));
        let resolver = resolver(fetcher.clone());

        assert!(!resolver.resolve("did:example:issuer").await.is_resolved());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failures_are_unresolved_and_not_cached() {
        let fetcher = Arc::new(ScriptedFetcher::failing(FetchError::Timeout));
        let resolver = resolver(fetcher.clone());

        assert!(!resolver.resolve("did:web:down.test").await.is_resolved());
        assert!(!resolver.resolve("did:web:down.test").await.is_resolved());
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_document_is_unresolved() {
        let fetcher = Arc::new(ScriptedFetcher::document(serde_json::json!({
            "id": "did:web:bad.test",
            "verificationMethod": "not-a-list"
        })));
        assert!(!resolver(fetcher).resolve("did:web:bad.test").await.is_resolved());
    }

    #[tokio::test]
    async fn test_non_rsa_key_is_unresolved() {
        let fetcher = Arc::new(ScriptedFetcher::document(serde_json::json!({
            "id": "did:web:ec.test",
            "verificationMethod": [{"id": "did:web:ec.test#k", "publicKeyJwk": {"kty": "EC", "crv": "P-256", "x": "AA", "y": "AA"}}],
            "assertionMethod": ["did:web:ec.test#k"]
        })));
        assert!(!resolver(fetcher).resolve("did:web:ec.test").await.is_resolved());
    }

    #[tokio::test]
    async fn test_document_for_other_did_is_unresolved() {
        let fetcher = Arc::new(ScriptedFetcher::document(issuer_document("did:web:someone-else.test")));
        assert!(!resolver(fetcher).resolve("did:web:issuer.test").await.is_resolved());
    }
}
