/// Credential signing
use crate::{
    credential::{ClaimSet, SignedToken},
    crypto::keys::{KeyLoadError, KeyMaterial},
};
use jsonwebtoken::{encode, Header};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignError {
    #[error(transparent)]
    KeyLoad(#[from] KeyLoadError),

    #[error("failed to encode token: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Turns claim sets into compact JWS tokens with the issuer's private key
#[derive(Clone)]
pub struct CredentialSigner {
    keys: Arc<dyn KeyMaterial>,
}

impl CredentialSigner {
    pub fn new(keys: Arc<dyn KeyMaterial>) -> Self {
        Self { keys }
    }

    /// Sign a claim set
    ///
    /// The private key is loaded on every call. Signing is unconditional; the
    /// validity window is whatever the caller put in the claim set.
    pub fn sign(&self, claims: &ClaimSet) -> Result<SignedToken, SignError> {
        let key = self.keys.load_private_key()?;
        let header = Header::new(self.keys.algorithm());

        let token = encode(&header, claims, &key)?;
        tracing::debug!("signed credential {} for subject {}", claims.jti, claims.sub);

        Ok(SignedToken::from(token))
    }
}
