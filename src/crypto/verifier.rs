/// Credential verification
///
/// Two passes: an untrusted peek reads `iss` for key selection only, then a
/// full decode checks the signature with the selected key and applies the
/// `nbf`/`exp` window.
use crate::{
    credential::{RejectReason, VerificationOutcome, VerifiedClaims},
    crypto::keys::KeyLoadError,
    trust::{TrustError, TrustPolicy, TrustPolicyEngine},
};
use jsonwebtoken::{decode, decode_header, errors::ErrorKind, DecodingKey, Validation};
use serde::Deserialize;
use std::collections::HashSet;

/// Issuer claim read from a token whose signature has not been checked
///
/// Only good for choosing a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnverifiedIssuer(String);

impl UnverifiedIssuer {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Deserialize)]
struct PeekedClaims {
    #[serde(default)]
    iss: Option<String>,
}

/// Read the issuer without verifying anything
pub fn peek_issuer(token: &str) -> Result<UnverifiedIssuer, RejectReason> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();

    let data = decode::<PeekedClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|_| RejectReason::MalformedToken)?;

    match data.claims.iss {
        Some(iss) if !iss.is_empty() => Ok(UnverifiedIssuer(iss)),
        _ => Err(RejectReason::MalformedToken),
    }
}

/// Verifies signed credentials against keys chosen by the trust policy
#[derive(Clone)]
pub struct CredentialVerifier {
    engine: TrustPolicyEngine,
}

impl CredentialVerifier {
    pub fn new(engine: TrustPolicyEngine) -> Self {
        Self { engine }
    }

    pub async fn verify(
        &self,
        token: &str,
        policy: &TrustPolicy,
    ) -> Result<VerificationOutcome, KeyLoadError> {
        self.verify_at(token, policy, chrono::Utc::now().timestamp()).await
    }

    /// Verify as of `now` (epoch seconds)
    ///
    /// Bad tokens come back as `Invalid`; only an unreadable static key is
    /// an `Err`.
    pub async fn verify_at(
        &self,
        token: &str,
        policy: &TrustPolicy,
        now: i64,
    ) -> Result<VerificationOutcome, KeyLoadError> {
        let issuer = match peek_issuer(token) {
            Ok(issuer) => issuer,
            Err(reason) => {
                let reason = self.classify_unreadable(token, policy, reason)?;
                return Ok(VerificationOutcome::Invalid(reason));
            }
        };

        let material = match self
            .engine
            .resolve_public_key_for(issuer.as_str(), policy)
            .await
        {
            Ok(material) => material,
            Err(TrustError::NoKeyAvailable) => {
                return Ok(VerificationOutcome::Invalid(RejectReason::NoKeyAvailable))
            }
            Err(TrustError::KeyLoad(e)) => return Err(e),
        };

        let mut validation = Validation::new(self.engine.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let claims = match decode::<VerifiedClaims>(token, &material.key, &validation) {
            Ok(data) => data.claims,
            Err(e) => {
                tracing::debug!(
                    "Rejected token from {} (key source {}): {}",
                    issuer.as_str(),
                    material.source.as_str(),
                    e
                );
                return Ok(VerificationOutcome::Invalid(reject_reason(e.kind())));
            }
        };

        // Zero leeway: valid on [nbf, exp)
        if now < claims.nbf {
            return Ok(VerificationOutcome::Invalid(RejectReason::NotYetValid));
        }
        if now >= claims.exp {
            return Ok(VerificationOutcome::Invalid(RejectReason::Expired));
        }

        Ok(VerificationOutcome::Valid(claims))
    }

    /// Reason for a token whose issuer could not be read
    ///
    /// A well-formed header and signature over an unreadable payload is
    /// checked against the static key when the policy allows it, so a
    /// corrupted payload reports `SignatureInvalid`. A signature that holds
    /// keeps `reason`.
    fn classify_unreadable(
        &self,
        token: &str,
        policy: &TrustPolicy,
        reason: RejectReason,
    ) -> Result<RejectReason, KeyLoadError> {
        let Some((message, signature)) = token.rsplit_once('.') else {
            return Ok(reason);
        };
        if message.matches('.').count() != 1 {
            return Ok(reason);
        }
        let Ok(header) = decode_header(token) else {
            return Ok(reason);
        };
        let Some(key) = self.engine.static_key(policy)? else {
            return Ok(reason);
        };

        if header.alg != self.engine.algorithm() {
            return Ok(RejectReason::SignatureInvalid);
        }

        match jsonwebtoken::crypto::verify(signature, message.as_bytes(), &key, header.alg) {
            Ok(true) => Ok(reason),
            _ => {
                tracing::debug!("Rejected token with unreadable claims: signature does not match");
                Ok(RejectReason::SignatureInvalid)
            }
        }
    }
}

fn reject_reason(kind: &ErrorKind) -> RejectReason {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::MissingAlgorithm => RejectReason::SignatureInvalid,
        ErrorKind::ExpiredSignature => RejectReason::Expired,
        ErrorKind::ImmatureSignature => RejectReason::NotYetValid,
        _ => RejectReason::MalformedToken,
    }
}
