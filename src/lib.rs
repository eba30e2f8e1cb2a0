/// Verifiable credential trust engine
///
/// Issues signed event-result credentials and decides at verification time
/// whether a token is authentic, inside its validity window and not revoked.
/// Issuer keys come from did:web documents or static PEM files according to
/// a per-call trust policy.

pub mod api;
pub mod config;
pub mod context;
pub mod credential;
pub mod crypto;
pub mod db;
pub mod error;
pub mod identity;
pub mod issuer;
pub mod metrics;
pub mod revocation;
pub mod server;
pub mod trust;

pub use config::ServerConfig;
pub use context::AppContext;
pub use error::{VcError, VcResult};
