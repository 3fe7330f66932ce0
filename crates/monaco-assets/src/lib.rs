//! Monaco Editor Asset Provisioning
//!
//! This crate downloads the Monaco editor asset bundle at first use and
//! serves it from a per-platform cache afterwards:
//! - Cache location and layout (platform cache dir, one directory per version)
//! - Archive download over TLS from the npm registry
//! - SHA-1 integrity verification against a pinned digest
//! - Safe tar.gz extraction (no traversal, no special files)
//! - Cache clearing
//!
//! The usual entry point is [`ensure_assets`], which returns the path to the
//! extracted `package/` directory.

pub mod checksum;
pub mod extract;
pub mod fetch;
pub mod provision;

pub use checksum::ChecksumError;
pub use extract::ExtractError;
pub use fetch::FetchError;
pub use provision::{
    clear_cache, ensure_assets, AssetProvisioner, AssetVersion, ProvisionError, DEFAULT_REGISTRY,
    PACKAGE_NAME, PINNED_SHA1, PINNED_VERSION,
};
