/// Static issuer key material loaded from PEM files
use crate::config::IssuerConfig;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure to obtain usable key material from disk
#[derive(Error, Debug)]
pub enum KeyLoadError {
    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key file {path} is not a well-formed {family} key: {reason}")]
    Malformed {
        path: PathBuf,
        family: &'static str,
        reason: String,
    },

    #[error("algorithm {0:?} is not an asymmetric signature algorithm")]
    UnsupportedAlgorithm(Algorithm),
}

/// Key family implied by a signature algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    Ec,
    Ed,
}

impl KeyFamily {
    pub fn for_algorithm(algorithm: Algorithm) -> Result<Self, KeyLoadError> {
        match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Ok(KeyFamily::Rsa),
            Algorithm::ES256 | Algorithm::ES384 => Ok(KeyFamily::Ec),
            Algorithm::EdDSA => Ok(KeyFamily::Ed),
            other => Err(KeyLoadError::UnsupportedAlgorithm(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyFamily::Rsa => "RSA",
            KeyFamily::Ec => "EC",
            KeyFamily::Ed => "Ed25519",
        }
    }
}

/// Source of the issuer's signing key and static verification key
///
/// Implementations do not cache; callers that want caching do it themselves.
pub trait KeyMaterial: Send + Sync {
    /// Signature algorithm the key pair is used with
    fn algorithm(&self) -> Algorithm;

    /// Load the private key used for signing
    fn load_private_key(&self) -> Result<EncodingKey, KeyLoadError>;

    /// Load the public key used on the static-fallback path
    fn load_public_key(&self) -> Result<DecodingKey, KeyLoadError>;
}

/// Key material read from two PEM files
#[derive(Debug, Clone)]
pub struct PemKeyProvider {
    algorithm: Algorithm,
    private_key_path: PathBuf,
    public_key_path: PathBuf,
}

impl PemKeyProvider {
    pub fn new(
        algorithm: Algorithm,
        private_key_path: impl Into<PathBuf>,
        public_key_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            algorithm,
            private_key_path: private_key_path.into(),
            public_key_path: public_key_path.into(),
        }
    }

    pub fn from_config(config: &IssuerConfig) -> Self {
        Self::new(
            config.algorithm,
            config.private_key_path.clone(),
            config.public_key_path.clone(),
        )
    }

    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }

    /// Raw PEM text of the public key
    pub fn read_public_pem(&self) -> Result<String, KeyLoadError> {
        let bytes = read_key_file(&self.public_key_path)?;
        String::from_utf8(bytes).map_err(|e| KeyLoadError::Malformed {
            path: self.public_key_path.clone(),
            family: "PEM",
            reason: e.to_string(),
        })
    }
}

impl KeyMaterial for PemKeyProvider {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn load_private_key(&self) -> Result<EncodingKey, KeyLoadError> {
        let family = KeyFamily::for_algorithm(self.algorithm)?;
        let pem = read_key_file(&self.private_key_path)?;

        let key = match family {
            KeyFamily::Rsa => EncodingKey::from_rsa_pem(&pem),
            KeyFamily::Ec => EncodingKey::from_ec_pem(&pem),
            KeyFamily::Ed => EncodingKey::from_ed_pem(&pem),
        };

        key.map_err(|e| KeyLoadError::Malformed {
            path: self.private_key_path.clone(),
            family: family.as_str(),
            reason: e.to_string(),
        })
    }

    fn load_public_key(&self) -> Result<DecodingKey, KeyLoadError> {
        let family = KeyFamily::for_algorithm(self.algorithm)?;
        let pem = read_key_file(&self.public_key_path)?;

        let key = match family {
            KeyFamily::Rsa => DecodingKey::from_rsa_pem(&pem),
            KeyFamily::Ec => DecodingKey::from_ec_pem(&pem),
            KeyFamily::Ed => DecodingKey::from_ed_pem(&pem),
        };

        key.map_err(|e| KeyLoadError::Malformed {
            path: self.public_key_path.clone(),
            family: family.as_str(),
            reason: e.to_string(),
        })
    }
}

fn read_key_file(path: &Path) -> Result<Vec<u8>, KeyLoadError> {
    std::fs::read(path).map_err(|source| KeyLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
