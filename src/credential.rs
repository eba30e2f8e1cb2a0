/// Credential data model: claim sets, signed tokens and verification verdicts
use crate::error::{VcError, VcResult};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Payload of a credential before signing
///
/// `jti` is the join key to the credential store and never changes once
/// minted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimSet {
    pub iss: String,
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    /// Opaque credential body (subject, event, result, issuer metadata)
    pub vc: serde_json::Value,
}

impl ClaimSet {
    /// Build a claim set with a freshly minted token id
    pub fn new(
        iss: impl Into<String>,
        sub: impl Into<String>,
        nbf: i64,
        exp: i64,
        vc: serde_json::Value,
    ) -> VcResult<Self> {
        Self::with_token_id(iss, sub, nbf, exp, mint_token_id(), vc)
    }

    pub fn with_token_id(
        iss: impl Into<String>,
        sub: impl Into<String>,
        nbf: i64,
        exp: i64,
        jti: impl Into<String>,
        vc: serde_json::Value,
    ) -> VcResult<Self> {
        if nbf > exp {
            return Err(VcError::Validation(format!(
                "not-before ({}) is after expiry ({})",
                nbf, exp
            )));
        }

        Ok(Self {
            iss: iss.into(),
            sub: sub.into(),
            nbf,
            exp,
            jti: jti.into(),
            vc,
        })
    }
}

/// Globally unique token id: `vc-` followed by 32 hex characters
pub fn mint_token_id() -> String {
    format!("vc-{}", uuid::Uuid::new_v4().simple())
}

/// Compact JWS produced by the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SignedToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Claims read back from a token whose signature and validity window checked out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaims {
    pub iss: String,
    pub sub: String,
    pub nbf: i64,
    pub exp: i64,
    #[serde(default)]
    pub jti: Option<String>,
    #[serde(default)]
    pub vc: serde_json::Value,
}

/// Subset of claims returned to relying parties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicClaims {
    pub jti: String,
    pub iss: String,
    pub sub: String,
    pub exp: i64,
}

/// Why a token was not admitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    NoKeyAvailable,
    SignatureInvalid,
    Expired,
    NotYetValid,
    MalformedToken,
    MissingTokenId,
    TokenIdNotRegistered,
    StatusNotValid(String),
}

impl RejectReason {
    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            RejectReason::NoKeyAvailable => "no_key_available",
            RejectReason::SignatureInvalid => "signature_invalid",
            RejectReason::Expired => "expired",
            RejectReason::NotYetValid => "not_yet_valid",
            RejectReason::MalformedToken => "malformed_token",
            RejectReason::MissingTokenId => "missing_token_id",
            RejectReason::TokenIdNotRegistered => "token_id_not_registered",
            RejectReason::StatusNotValid(_) => "status_not_valid",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NoKeyAvailable => f.write_str("no-public-key-available"),
            RejectReason::SignatureInvalid => f.write_str("signature-invalid"),
            RejectReason::Expired => f.write_str("expired"),
            RejectReason::NotYetValid => f.write_str("not-yet-valid"),
            RejectReason::MalformedToken => f.write_str("malformed-token"),
            RejectReason::MissingTokenId => f.write_str("no-jti-in-token"),
            RejectReason::TokenIdNotRegistered => f.write_str("jti-not-found"),
            RejectReason::StatusNotValid(status) => write!(f, "status={}", status),
        }
    }
}

impl Serialize for RejectReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Result of signature and time-window verification
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    Valid(VerifiedClaims),
    Invalid(RejectReason),
}

impl VerificationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerificationOutcome::Valid(_))
    }
}

/// Final admit/deny answer returned to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrustVerdict {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claims: Option<PublicClaims>,
}

impl TrustVerdict {
    pub fn admit(claims: PublicClaims) -> Self {
        Self {
            valid: true,
            reason: None,
            claims: Some(claims),
        }
    }

    pub fn deny(reason: RejectReason) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            claims: None,
        }
    }
}
