/// JSON Web Key handling for RSA public keys
///
/// Converts a PEM public key into its `{kty, n, e}` form for publishing in a
/// DID document, and rebuilds a verification key from that form on the
/// resolving side.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use jsonwebtoken::DecodingKey;
use rsa::{
    pkcs1::DecodeRsaPublicKey, pkcs8::DecodePublicKey, traits::PublicKeyParts, RsaPublicKey,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwkError {
    #[error("unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("missing key component: {0}")]
    MissingComponent(&'static str),

    #[error("invalid key component: {0}")]
    InvalidComponent(String),

    #[error("invalid RSA public key PEM: {0}")]
    InvalidPem(String),
}

/// Public key in JSON Web Key form
///
/// Only the members needed for RSA are modelled; anything else in the
/// document is ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

impl Jwk {
    pub fn rsa(n: impl Into<String>, e: impl Into<String>) -> Self {
        Self {
            kty: "RSA".to_string(),
            n: Some(n.into()),
            e: Some(e.into()),
        }
    }

    /// Rebuild an RSA verification key from modulus and exponent
    pub fn to_rsa_decoding_key(&self) -> Result<DecodingKey, JwkError> {
        if self.kty != "RSA" {
            return Err(JwkError::UnsupportedKeyType(self.kty.clone()));
        }

        let n = component(self.n.as_deref(), "n")?;
        let e = component(self.e.as_deref(), "e")?;

        DecodingKey::from_rsa_components(n, e)
            .map_err(|err| JwkError::InvalidComponent(err.to_string()))
    }
}

/// Trim optional padding and require a non-empty base64url integer
fn component<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, JwkError> {
    let value = value
        .map(|v| v.trim_end_matches('='))
        .ok_or(JwkError::MissingComponent(name))?;

    if value.is_empty() {
        return Err(JwkError::InvalidComponent(format!("{} is empty", name)));
    }

    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| JwkError::InvalidComponent(format!("{}: {}", name, err)))?;

    Ok(value)
}

/// Encode a big-endian unsigned integer as base64url without padding
pub fn encode_uint(bytes: &[u8]) -> String {
    let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    URL_SAFE_NO_PAD.encode(&bytes[first_nonzero..])
}

/// Convert an RSA public key PEM (SPKI or PKCS#1) to a JWK
pub fn rsa_public_jwk(pem: &str) -> Result<Jwk, JwkError> {
    let key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| JwkError::InvalidPem(e.to_string()))?;

    Ok(Jwk::rsa(
        encode_uint(&key.n().to_bytes_be()),
        encode_uint(&key.e().to_bytes_be()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::tests::issuer_keys;

    #[test]
    fn test_rsa_public_jwk_from_fixture() {
        let pem = issuer_keys().read_public_pem().unwrap();
        let jwk = rsa_public_jwk(&pem).unwrap();

        assert_eq!(jwk.kty, "RSA");
        // 65537
        assert_eq!(jwk.e.as_deref(), Some("AQAB"));
        // 2048-bit modulus is 256 bytes -> 342 base64url chars
        assert_eq!(jwk.n.as_ref().unwrap().len(), 342);
        assert!(jwk.to_rsa_decoding_key().is_ok());
    }

    #[test]
    fn test_non_rsa_key_type() {
        let jwk = Jwk {
            kty: "EC".to_string(),
            n: None,
            e: None,
        };
        assert_eq!(
            jwk.to_rsa_decoding_key().err(),
            Some(JwkError::UnsupportedKeyType("EC".to_string()))
        );
    }

    #[test]
    fn test_missing_exponent() {
        let jwk = Jwk {
            kty: "RSA".to_string(),
            n: Some("AQAB".to_string()),
            e: None,
        };
        assert_eq!(
            jwk.to_rsa_decoding_key().err(),
            Some(JwkError::MissingComponent("e"))
        );
    }

    #[test]
    fn test_invalid_base64_component() {
        let jwk = Jwk::rsa("not*base64", "AQAB");
        assert!(matches!(
            jwk.to_rsa_decoding_key(),
            Err(JwkError::InvalidComponent(_))
        ));
    }

    #[test]
    fn test_padded_components_are_accepted() {
        let jwk = Jwk::rsa("AQAB", "AQAB==");
        assert!(jwk.to_rsa_decoding_key().is_ok());
    }

    #[test]
    fn test_encode_uint_strips_leading_zeros() {
        assert_eq!(encode_uint(&[0, 0, 1, 0, 1]), "AQAB");
    }

    #[test]
    fn test_invalid_pem() {
        assert!(matches!(
            rsa_public_jwk("garbage"),
            Err(JwkError::InvalidPem(_))
        ));
    }
}
