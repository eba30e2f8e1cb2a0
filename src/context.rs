/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    crypto::{
        keys::{KeyMaterial, PemKeyProvider},
        signer::CredentialSigner,
        verifier::CredentialVerifier,
    },
    db::{self, CredentialStore, SqliteCredentialStore},
    error::{VcError, VcResult},
    identity::{DidWebResolver, DocumentFetcher, HttpsDocumentFetcher, InMemoryKeyCache},
    issuer::CredentialIssuer,
    revocation::RevocationComposer,
    trust::{TrustPolicy, TrustPolicyEngine},
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub keys: Arc<PemKeyProvider>,
    pub issuer: Arc<CredentialIssuer>,
    pub composer: Arc<RevocationComposer>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> VcResult<Self> {
        let fetcher = HttpsDocumentFetcher::new(config.trust.did_web_timeout())
            .map_err(|e| VcError::Internal(e.to_string()))?;

        Self::with_fetcher(config, Arc::new(fetcher)).await
    }

    /// Create a context that resolves did:web documents through `fetcher`
    pub async fn with_fetcher(
        config: ServerConfig,
        fetcher: Arc<dyn DocumentFetcher>,
    ) -> VcResult<Self> {
        // Validate configuration
        config.validate()?;

        // Fail fast on unreadable key material
        let keys = Arc::new(PemKeyProvider::from_config(&config.issuer));
        keys.load_private_key()?;
        keys.load_public_key()?;
        tracing::info!(
            "Loaded {:?} issuer keys from {}",
            keys.algorithm(),
            keys.public_key_path().display()
        );

        // Initialize credential database
        let db = db::create_pool(&config.storage.credential_db, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;
        let store: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(db.clone()));

        // did:web keys are cached for the life of the process
        let resolver = Arc::new(DidWebResolver::new(Arc::new(InMemoryKeyCache::new()), fetcher));

        let engine = TrustPolicyEngine::new(resolver, keys.clone());
        let composer = Arc::new(RevocationComposer::new(
            CredentialVerifier::new(engine),
            store.clone(),
        ));

        let issuer = Arc::new(CredentialIssuer::new(
            config.issuer.clone(),
            CredentialSigner::new(keys.clone()),
            store,
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            keys,
            issuer,
            composer,
        })
    }

    /// Trust policy applied to every verification request
    pub fn trust_policy(&self) -> TrustPolicy {
        self.config.trust.policy()
    }

    pub fn issuer_did(&self) -> &str {
        &self.config.issuer.issuer_did
    }

    /// Link a verifier follows to check a credential by id
    pub fn verify_url(&self, jti: &str) -> String {
        format!("{}?jti={}", self.config.service.verify_base_url, jti)
    }
}
