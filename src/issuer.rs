/// Credential issuance and lifecycle management
use crate::{
    config::{IssuerConfig, MAX_EXP_DAYS},
    credential::{ClaimSet, SignedToken},
    crypto::signer::CredentialSigner,
    db::{CredentialRecord, CredentialStatus, CredentialStore},
    error::{VcError, VcResult},
    metrics,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use validator::Validate;

const SECONDS_PER_DAY: i64 = 86_400;

/// Request to issue an event result credential
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[serde(alias = "athleteDid")]
    #[validate(length(min = 1, message = "subjectDid is required"))]
    pub subject_did: String,

    #[validate(length(min = 1, max = 256, message = "name must be 1-256 characters"))]
    pub name: String,

    pub event: Map<String, Value>,

    pub result: Map<String, Value>,

    /// Lifetime in days; the configured default when absent
    #[validate(range(min = 1, max = 36500, message = "expDays must be between 1 and 36500"))]
    pub exp_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedCredential {
    pub jti: String,
    pub token: SignedToken,
}

/// Issuance metadata, without the token itself
#[derive(Debug, Clone, Serialize)]
pub struct CredentialSummary {
    pub jti: String,
    pub subject: String,
    pub status: CredentialStatus,
    pub exp: i64,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CredentialDetail {
    #[serde(flatten)]
    pub summary: CredentialSummary,
    pub jwt_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_changed_at: Option<DateTime<Utc>>,
}

impl From<&CredentialRecord> for CredentialSummary {
    fn from(record: &CredentialRecord) -> Self {
        Self {
            jti: record.jti.clone(),
            subject: record.subject.clone(),
            status: record.status.clone(),
            exp: record.exp,
            issued_at: record.issued_at,
        }
    }
}

impl From<CredentialRecord> for CredentialDetail {
    fn from(record: CredentialRecord) -> Self {
        Self {
            summary: CredentialSummary::from(&record),
            jwt_len: record.token.as_str().len(),
            status_note: record.status_note,
            status_changed_at: record.status_changed_at,
        }
    }
}

/// Issues, revokes and lists credentials for the configured issuer
#[derive(Clone)]
pub struct CredentialIssuer {
    config: IssuerConfig,
    signer: CredentialSigner,
    store: Arc<dyn CredentialStore>,
}

impl CredentialIssuer {
    pub fn new(config: IssuerConfig, signer: CredentialSigner, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            config,
            signer,
            store,
        }
    }

    pub async fn issue(&self, request: IssueRequest) -> VcResult<IssuedCredential> {
        self.issue_at(request, Utc::now().timestamp()).await
    }

    /// Sign and record a credential valid from `now`
    pub async fn issue_at(&self, request: IssueRequest, now: i64) -> VcResult<IssuedCredential> {
        request
            .validate()
            .map_err(|e| VcError::Validation(e.to_string()))?;

        let exp_days = request.exp_days.unwrap_or(self.config.default_exp_days);
        if !(1..=MAX_EXP_DAYS).contains(&exp_days) {
            return Err(VcError::Validation(format!(
                "expDays must be between 1 and {}",
                MAX_EXP_DAYS
            )));
        }
        let exp = exp_days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(|lifetime| now.checked_add(lifetime))
            .ok_or_else(|| VcError::Validation("Credential expiry is out of range".to_string()))?;

        let claims = ClaimSet::new(
            self.config.issuer_did.clone(),
            request.subject_did.clone(),
            now,
            exp,
            self.credential_body(&request),
        )?;

        let token = self.signer.sign(&claims)?;
        self.store
            .insert(&claims.jti, &claims.sub, &token, claims.exp)
            .await?;

        metrics::record_issued();
        tracing::info!("Issued credential {} to {}", claims.jti, claims.sub);

        Ok(IssuedCredential {
            jti: claims.jti,
            token,
        })
    }

    fn credential_body(&self, request: &IssueRequest) -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiableCredential", "EventResultCredential"],
            "credentialSubject": {
                "subject": {"id": request.subject_did, "name": request.name},
                "event": request.event,
                "result": request.result,
                "issuerMetadata": {"organization": self.config.organization},
            },
        })
    }

    /// Mark a credential revoked; revoking an already revoked one is a no-op
    pub async fn revoke(&self, jti: &str, note: Option<&str>) -> VcResult<CredentialRecord> {
        let record = self
            .store
            .get(jti)
            .await?
            .ok_or_else(|| VcError::NotFound(format!("Credential {} not found", jti)))?;

        if record.status == CredentialStatus::Revoked {
            return Ok(record);
        }

        self.store
            .set_status(jti, &CredentialStatus::Revoked, note)
            .await?;
        metrics::record_revoked();
        tracing::info!("Revoked credential {}", jti);

        self.store
            .get(jti)
            .await?
            .ok_or_else(|| VcError::NotFound(format!("Credential {} not found", jti)))
    }

    pub async fn list(&self, subject: Option<&str>) -> VcResult<Vec<CredentialSummary>> {
        let records = self.store.list(subject).await?;
        Ok(records.iter().map(CredentialSummary::from).collect())
    }

    pub async fn detail(&self, jti: &str) -> VcResult<CredentialDetail> {
        self.store
            .get(jti)
            .await?
            .map(CredentialDetail::from)
            .ok_or_else(|| VcError::NotFound(format!("Credential {} not found", jti)))
    }

    /// Whether a credential with this id was issued here
    pub async fn exists(&self, jti: &str) -> VcResult<bool> {
        Ok(self.store.get(jti).await?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::crypto::keys::tests::issuer_keys;
    use crate::crypto::verifier::peek_issuer;
    use crate::db::credential::tests::memory_store;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

    const NOW: i64 = 1_750_000_000;

    async fn issuer() -> CredentialIssuer {
        CredentialIssuer::new(
            test_config().issuer,
            CredentialSigner::new(Arc::new(issuer_keys())),
            Arc::new(memory_store().await),
        )
    }

    fn request(exp_days: Option<i64>) -> IssueRequest {
        serde_json::from_value(json!({
            "subjectDid": "did:example:athlete",
            "name": "Alex Doe",
            "event": {"name": "Spring Open", "date": "2025-04-12"},
            "result": {"division": "Pro", "totalTime": "01:05:23"},
            "expDays": exp_days,
        }))
        .unwrap()
    }

    fn payload(token: &SignedToken) -> Value {
        let segment = token.as_str().split('.').nth(1).unwrap();
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_issue_builds_claims_and_stores_record() {
        let issuer = issuer().await;
        let issued = issuer.issue_at(request(Some(30)), NOW).await.unwrap();

        let claims = payload(&issued.token);
        assert_eq!(claims["iss"], test_config().issuer.issuer_did);
        assert_eq!(claims["sub"], "did:example:athlete");
        assert_eq!(claims["nbf"], NOW);
        assert_eq!(claims["exp"], NOW + 30 * SECONDS_PER_DAY);
        assert_eq!(claims["jti"], issued.jti.as_str());
        assert_eq!(
            claims["vc"]["credentialSubject"]["subject"]["name"],
            "Alex Doe"
        );
        assert_eq!(
            claims["vc"]["credentialSubject"]["result"]["totalTime"],
            "01:05:23"
        );
        assert_eq!(claims["vc"]["type"][1], "EventResultCredential");

        let detail = issuer.detail(&issued.jti).await.unwrap();
        assert_eq!(detail.summary.status, CredentialStatus::Valid);
        assert_eq!(detail.jwt_len, issued.token.as_str().len());
        assert_eq!(peek_issuer(issued.token.as_str()).unwrap().as_str(), test_config().issuer.issuer_did);
    }

    #[tokio::test]
    async fn test_default_lifetime_from_config() {
        let issuer = issuer().await;
        let issued = issuer.issue_at(request(None), NOW).await.unwrap();

        let expected = NOW + test_config().issuer.default_exp_days * SECONDS_PER_DAY;
        assert_eq!(payload(&issued.token)["exp"], expected);
    }

    #[tokio::test]
    async fn test_invalid_requests_are_rejected() {
        let issuer = issuer().await;

        let err = issuer.issue_at(request(Some(0)), NOW).await.unwrap_err();
        assert!(matches!(err, VcError::Validation(_)));

        let mut missing_subject = request(Some(1));
        missing_subject.subject_did = String::new();
        let err = issuer.issue_at(missing_subject, NOW).await.unwrap_err();
        assert!(matches!(err, VcError::Validation(_)));

        assert!(issuer.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_default_lifetime_is_rejected() {
        let mut config = test_config().issuer;
        config.default_exp_days = i64::MAX / 2;
        let issuer = CredentialIssuer::new(
            config,
            CredentialSigner::new(Arc::new(issuer_keys())),
            Arc::new(memory_store().await),
        );

        let err = issuer.issue_at(request(None), NOW).await.unwrap_err();
        assert!(matches!(err, VcError::Validation(_)));

        let err = issuer.issue_at(request(Some(1)), i64::MAX - 10).await.unwrap_err();
        assert!(matches!(err, VcError::Validation(_)));
        assert!(issuer.list(None).await.unwrap().is_empty());
    }

    #[test]
    fn test_legacy_subject_field_name() {
        let request: IssueRequest = serde_json::from_value(json!({
            "athleteDid": "did:example:athlete",
            "name": "Alex Doe",
            "event": {},
            "result": {},
        }))
        .unwrap();
        assert_eq!(request.subject_did, "did:example:athlete");
        assert_eq!(request.exp_days, None);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let issuer = issuer().await;
        let issued = issuer.issue_at(request(Some(30)), NOW).await.unwrap();

        let first = issuer.revoke(&issued.jti, Some("timing error")).await.unwrap();
        assert_eq!(first.status, CredentialStatus::Revoked);
        assert_eq!(first.status_note.as_deref(), Some("timing error"));

        let second = issuer.revoke(&issued.jti, Some("again")).await.unwrap();
        assert_eq!(second.status, CredentialStatus::Revoked);
        assert_eq!(second.status_note.as_deref(), Some("timing error"));
        assert_eq!(second.status_changed_at, first.status_changed_at);
    }

    #[tokio::test]
    async fn test_revoke_unknown_is_not_found() {
        let err = issuer().await.revoke("vc-unknown", None).await.unwrap_err();
        assert!(matches!(err, VcError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_by_subject() {
        let issuer = issuer().await;
        issuer.issue_at(request(Some(1)), NOW).await.unwrap();
        issuer.issue_at(request(Some(1)), NOW).await.unwrap();

        assert_eq!(issuer.list(None).await.unwrap().len(), 2);
        assert_eq!(issuer.list(Some("did:example:athlete")).await.unwrap().len(), 2);
        assert!(issuer.list(Some("did:example:nobody")).await.unwrap().is_empty());
        assert!(!issuer.exists("vc-unknown").await.unwrap());
    }
}
