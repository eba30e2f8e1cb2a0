/// DID document model and assertion key extraction
use crate::{
    crypto::jwk::{Jwk, JwkError},
    identity::ResolveFailure,
};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};

/// A DID document, reduced to what key resolution needs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assertion_method: Option<OneOrMany<MethodReference>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type", default)]
    pub method_type: String,
    #[serde(default)]
    pub controller: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_jwk: Option<Jwk>,
}

/// assertionMethod entries are either a bare id or an embedded object with an id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodReference {
    Id(String),
    Embedded { id: String },
}

impl MethodReference {
    pub fn id(&self) -> &str {
        match self {
            MethodReference::Id(id) => id,
            MethodReference::Embedded { id } => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn first(&self) -> Option<&T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.first(),
        }
    }
}

impl DidDocument {
    /// Parse a fetched JSON document
    pub fn from_json(value: serde_json::Value) -> Result<Self, ResolveFailure> {
        serde_json::from_value(value).map_err(|e| ResolveFailure::MalformedDocument(e.to_string()))
    }

    /// Document publishing a single RSA key as the assertion method
    pub fn for_rsa_issuer(did: &str, jwk: Jwk) -> Self {
        let key_id = format!("{}#keys-1", did);
        Self {
            context: Some(serde_json::json!(["https://www.w3.org/ns/did/v1"])),
            id: did.to_string(),
            verification_method: vec![VerificationMethod {
                id: key_id.clone(),
                method_type: "JsonWebKey2020".to_string(),
                controller: did.to_string(),
                public_key_jwk: Some(jwk),
            }],
            assertion_method: Some(OneOrMany::Many(vec![MethodReference::Id(key_id)])),
        }
    }

    /// Verification method referenced by the first assertionMethod entry
    pub fn assertion_verification_method(&self) -> Result<&VerificationMethod, ResolveFailure> {
        let reference = self
            .assertion_method
            .as_ref()
            .and_then(OneOrMany::first)
            .ok_or(ResolveFailure::NoAssertionMethod)?;

        self.verification_method
            .iter()
            .find(|vm| vm.id == reference.id())
            .ok_or_else(|| ResolveFailure::VerificationMethodNotFound(reference.id().to_string()))
    }

    /// Public key authorised to sign assertions for this DID
    pub fn assertion_key(&self) -> Result<DecodingKey, ResolveFailure> {
        let method = self.assertion_verification_method()?;
        let jwk = method
            .public_key_jwk
            .as_ref()
            .ok_or_else(|| ResolveFailure::UnsupportedKeyType("none".to_string()))?;

        jwk.to_rsa_decoding_key().map_err(|e| match e {
            JwkError::UnsupportedKeyType(kty) => ResolveFailure::UnsupportedKeyType(kty),
            other => ResolveFailure::InvalidKeyMaterial(other.to_string()),
        })
    }
}
