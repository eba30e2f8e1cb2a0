/// Revocation-aware trust checks
///
/// Combines signature/time verification with the credential store's status
/// to produce the final admit or deny verdict.
use crate::{
    credential::{PublicClaims, RejectReason, TrustVerdict, VerificationOutcome, VerifiedClaims},
    crypto::verifier::CredentialVerifier,
    db::{CredentialRecord, CredentialStore},
    error::VcResult,
    metrics,
    trust::TrustPolicy,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct RevocationComposer {
    verifier: CredentialVerifier,
    store: Arc<dyn CredentialStore>,
}

impl RevocationComposer {
    pub fn new(verifier: CredentialVerifier, store: Arc<dyn CredentialStore>) -> Self {
        Self { verifier, store }
    }

    /// Verdict for a presented token
    pub async fn check_trust(&self, token: &str, policy: &TrustPolicy) -> VcResult<TrustVerdict> {
        self.check_trust_at(token, policy, chrono::Utc::now().timestamp())
            .await
    }

    pub async fn check_trust_at(
        &self,
        token: &str,
        policy: &TrustPolicy,
        now: i64,
    ) -> VcResult<TrustVerdict> {
        let claims = match self.verifier.verify_at(token, policy, now).await? {
            VerificationOutcome::Valid(claims) => claims,
            VerificationOutcome::Invalid(reason) => return Ok(record(TrustVerdict::deny(reason))),
        };

        let Some(jti) = claims.jti.clone().filter(|j| !j.is_empty()) else {
            return Ok(record(TrustVerdict::deny(RejectReason::MissingTokenId)));
        };

        let verdict = match self.store.get(&jti).await? {
            Some(stored) => compose(claims, jti, &stored),
            None => TrustVerdict::deny(RejectReason::TokenIdNotRegistered),
        };

        Ok(record(verdict))
    }

    /// Verdict for a credential referenced by id, e.g. from a scanned link
    ///
    /// The stored token is verified, so a tampered row fails the same way a
    /// tampered presentation would.
    pub async fn check_trust_by_token_id(
        &self,
        jti: &str,
        policy: &TrustPolicy,
    ) -> VcResult<TrustVerdict> {
        self.check_trust_by_token_id_at(jti, policy, chrono::Utc::now().timestamp())
            .await
    }

    pub async fn check_trust_by_token_id_at(
        &self,
        jti: &str,
        policy: &TrustPolicy,
        now: i64,
    ) -> VcResult<TrustVerdict> {
        let Some(stored) = self.store.get(jti).await? else {
            return Ok(record(TrustVerdict::deny(RejectReason::TokenIdNotRegistered)));
        };

        let verdict = match self.verifier.verify_at(stored.token.as_str(), policy, now).await? {
            VerificationOutcome::Invalid(reason) => TrustVerdict::deny(reason),
            VerificationOutcome::Valid(claims) => match claims.jti.as_deref() {
                None | Some("") => TrustVerdict::deny(RejectReason::MissingTokenId),
                Some(claimed) if claimed != jti => {
                    tracing::warn!("Stored credential {} carries token id {}", jti, claimed);
                    TrustVerdict::deny(RejectReason::TokenIdNotRegistered)
                }
                Some(_) => compose(claims, jti.to_string(), &stored),
            },
        };

        Ok(record(verdict))
    }
}

fn compose(claims: VerifiedClaims, jti: String, stored: &CredentialRecord) -> TrustVerdict {
    if !stored.status.is_valid() {
        return TrustVerdict::deny(RejectReason::StatusNotValid(stored.status.to_string()));
    }

    TrustVerdict::admit(PublicClaims {
        jti,
        iss: claims.iss,
        sub: claims.sub,
        exp: claims.exp,
    })
}

fn record(verdict: TrustVerdict) -> TrustVerdict {
    let reason = verdict.reason.as_ref().map(RejectReason::label).unwrap_or("");
    metrics::record_verification(verdict.valid, reason);

    if let Some(reason) = &verdict.reason {
        tracing::info!("Credential rejected: {}", reason);
    }

    verdict
}
