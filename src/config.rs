/// Configuration management for the credential service
use crate::error::{VcError, VcResult};
use crate::trust::TrustPolicy;
use jsonwebtoken::Algorithm;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Longest credential lifetime accepted from config or a request
pub const MAX_EXP_DAYS: i64 = 36_500;

/// Filter used when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "vc_trust=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub issuer: IssuerConfig,
    pub trust: TrustConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
    /// Base URL embedded in holder verification links
    pub verify_base_url: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub credential_db: PathBuf,
}

/// Issuer identity and key material
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    pub issuer_did: String,
    pub organization: String,
    pub algorithm: Algorithm,
    pub private_key_path: PathBuf,
    pub public_key_path: PathBuf,
    /// Credential lifetime used when a request does not name one
    pub default_exp_days: i64,
}

/// Trust policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustConfig {
    pub use_did_web: bool,
    pub allow_pem_fallback: bool,
    pub did_web_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl TrustConfig {
    /// Policy handed to every verification call
    pub fn policy(&self) -> TrustPolicy {
        TrustPolicy {
            use_did_web: self.use_did_web,
            allow_static_fallback: self.allow_pem_fallback,
        }
    }

    pub fn did_web_timeout(&self) -> Duration {
        Duration::from_secs(self.did_web_timeout_secs)
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> VcResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("VC_HOSTNAME").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("VC_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| VcError::Validation("Invalid port number".to_string()))?;
        let version = env::var("VC_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());
        let verify_base_url = env::var("VC_VERIFY_BASE_URL")
            .unwrap_or_else(|_| format!("http://{}:{}/verifier/scan", hostname, port));

        let credential_db = env::var("VC_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/credentials.sqlite"));

        let issuer_did = env::var("VC_ISSUER_DID").unwrap_or_else(|_| "did:example:issuer".to_string());
        let organization =
            env::var("VC_ISSUER_ORGANIZATION").unwrap_or_else(|_| "Example Issuer".to_string());
        let alg_name = env::var("VC_JWT_ALG").unwrap_or_else(|_| "RS256".to_string());
        let algorithm = Algorithm::from_str(&alg_name).map_err(|_| {
            VcError::Validation(format!("Unsupported signature algorithm: {}", alg_name))
        })?;
        let private_key_path = env::var("VC_ISSUER_PRIVATE_KEY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("keys/issuer_private.pem"));
        let public_key_path = env::var("VC_ISSUER_PUBLIC_KEY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("keys/issuer_public.pem"));
        let default_exp_days = env::var("VC_DEFAULT_EXP_DAYS")
            .unwrap_or_else(|_| "365".to_string())
            .parse()
            .unwrap_or(365);

        let use_did_web = parse_bool_env("VC_USE_DID_WEB", false)?;
        let allow_pem_fallback = parse_bool_env("VC_ALLOW_PEM_FALLBACK", true)?;
        let did_web_timeout_secs = env::var("VC_DID_WEB_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .unwrap_or(5);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
                verify_base_url,
            },
            storage: StorageConfig { credential_db },
            issuer: IssuerConfig {
                issuer_did,
                organization,
                algorithm,
                private_key_path,
                public_key_path,
                default_exp_days,
            },
            trust: TrustConfig {
                use_did_web,
                allow_pem_fallback,
                did_web_timeout_secs,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> VcResult<()> {
        if self.service.hostname.is_empty() {
            return Err(VcError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.issuer.issuer_did.trim().is_empty() {
            return Err(VcError::Validation("Issuer DID cannot be empty".to_string()));
        }

        if !(1..=MAX_EXP_DAYS).contains(&self.issuer.default_exp_days) {
            return Err(VcError::Validation(format!(
                "Default credential lifetime must be between 1 and {} days",
                MAX_EXP_DAYS
            )));
        }

        if self.trust.did_web_timeout_secs == 0 {
            return Err(VcError::Validation(
                "did:web timeout must be greater than zero".to_string(),
            ));
        }

        if !self.trust.use_did_web && !self.trust.allow_pem_fallback {
            tracing::warn!("did:web resolution and PEM fallback are both disabled; every verification will fail");
        }

        Ok(())
    }
}
/// Read a boolean flag, falling back to `default` only when it is unset
fn parse_bool_env(name: &str, default: bool) -> VcResult<bool> {
    match env::var(name) {
        Ok(value) => parse_bool(&value).ok_or_else(|| {
            VcError::Validation(format!("{} must be a boolean, got {:?}", name, value))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
