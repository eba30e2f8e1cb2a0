/// Key material, JWK conversion, signing and verification of credentials

pub mod jwk;
pub mod keys;
pub mod signer;
pub mod verifier;

pub use keys::{KeyLoadError, KeyMaterial, PemKeyProvider};
pub use signer::{CredentialSigner, SignError};
pub use verifier::{peek_issuer, CredentialVerifier, UnverifiedIssuer};
