//! Monaco editor asset provisioning
//!
//! Downloads the pinned Monaco editor release from the npm registry on first
//! use, verifies its digest, extracts it into a per-platform cache
//! directory, and returns the path for reuse. Subsequent calls hit the cache
//! and never touch the network.

use crate::checksum::{self, ChecksumError};
use crate::extract::{self, ExtractError};
use crate::fetch::{AssetFetcher, FetchError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Package name on the npm registry
pub const PACKAGE_NAME: &str = "monaco-editor";

/// Pinned release version
pub const PINNED_VERSION: &str = "0.54.0";

/// SHA-1 digest of the pinned release tarball, as published by the registry
pub const PINNED_SHA1: &str = "c0d6ebb46b83f1bef6f67f6aa471e38ba7ef8231";

/// Default registry base URL
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Errors that can occur while provisioning assets
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Download failed (DNS, connection, TLS, non-success status)
    #[error("Failed to download assets: {0}")]
    Fetch(#[from] FetchError),

    /// Archive digest did not match the pinned value
    #[error("Asset integrity check failed: {0}")]
    Checksum(#[from] ChecksumError),

    /// Archive was corrupt or contained unsafe members
    #[error("Failed to extract assets: {0}")]
    Extract(#[from] ExtractError),

    /// Filesystem operation failed
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The platform cache directory could not be determined
    #[error("Failed to locate cache directory: {0}")]
    CacheDir(String),
}

impl ProvisionError {
    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// A versioned asset bundle: registry package name, version, and the
/// expected SHA-1 digest of its tarball.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetVersion {
    /// Registry package name
    pub name: String,
    /// Version string
    pub version: String,
    /// Expected lowercase hex SHA-1 digest of the tarball
    pub sha1: String,
}

impl AssetVersion {
    /// Create an asset version triple
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        sha1: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            sha1: sha1.into(),
        }
    }

    /// The pinned Monaco editor release this crate ships
    pub fn pinned() -> Self {
        Self::new(PACKAGE_NAME, PINNED_VERSION, PINNED_SHA1)
    }

    /// Directory name for this version: `<name>-<version>`
    pub fn dir_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Tarball file name: `<name>-<version>.tgz`
    pub fn archive_name(&self) -> String {
        format!("{}-{}.tgz", self.name, self.version)
    }

    /// Tarball URL under a registry base: `<registry>/<name>/-/<name>-<version>.tgz`
    pub fn download_url(&self, registry_url: &str) -> String {
        format!(
            "{}/{}/-/{}",
            registry_url.trim_end_matches('/'),
            self.name,
            self.archive_name()
        )
    }
}

/// Provisions Monaco editor assets into a local cache
///
/// Directory layout under the cache root:
/// ```text
/// <cache-root>/
/// └── monaco-editor-<version>/
///     ├── monaco-editor-<version>.tgz   (transient, deleted after extraction)
///     └── package/                      (extracted assets, the final artifact)
/// ```
///
/// The cache root is injected at construction; nothing is read from ambient
/// global state.
pub struct AssetProvisioner {
    cache_root: PathBuf,
    registry_url: String,
    asset: AssetVersion,
}

impl AssetProvisioner {
    /// Create a provisioner with the platform default cache root and the
    /// pinned release.
    ///
    /// Errors when the platform cache directory cannot be determined.
    pub fn new() -> Result<Self, ProvisionError> {
        Ok(Self::with_cache_root(default_cache_root()?))
    }

    /// Create a provisioner rooted at `cache_root`, with the pinned release
    /// and default registry.
    pub fn with_cache_root(cache_root: PathBuf) -> Self {
        Self::with_source(cache_root, DEFAULT_REGISTRY, AssetVersion::pinned())
    }

    /// Create a provisioner with a fully injected source: cache root,
    /// registry base URL, and asset version triple.
    pub fn with_source(cache_root: PathBuf, registry_url: &str, asset: AssetVersion) -> Self {
        Self {
            cache_root,
            registry_url: registry_url.trim_end_matches('/').to_string(),
            asset,
        }
    }

    /// The cache root directory
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    /// The per-version directory: `<cache-root>/<name>-<version>`
    pub fn assets_dir(&self) -> PathBuf {
        self.cache_root.join(self.asset.dir_name())
    }

    /// The extracted package directory: `<cache-root>/<name>-<version>/package`
    pub fn package_dir(&self) -> PathBuf {
        self.assets_dir().join("package")
    }

    /// Ensure the assets are present locally, downloading them on first use.
    ///
    /// Returns the path to the extracted `package/` directory. If that
    /// directory already exists and is non-empty it is returned immediately
    /// with no network access and no re-verification. Otherwise the tarball
    /// is downloaded, verified against the pinned digest, extracted, and
    /// deleted; any failure removes the partially populated version
    /// directory before the error is returned.
    pub fn ensure_assets(&self) -> Result<PathBuf, ProvisionError> {
        let assets_dir = self.assets_dir();
        let package_dir = self.package_dir();

        if dir_is_populated(&package_dir) {
            debug!(path = %package_dir.display(), "assets already cached");
            return Ok(package_dir);
        }

        match self.populate(&assets_dir) {
            Ok(()) => Ok(package_dir),
            Err(e) => {
                // Best-effort cleanup; the original error is what matters.
                if assets_dir.exists() {
                    if let Err(cleanup) = fs::remove_dir_all(&assets_dir) {
                        warn!(
                            path = %assets_dir.display(),
                            error = %cleanup,
                            "failed to clean up partially populated assets"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    /// Download, verify, and extract the tarball into `assets_dir`.
    fn populate(&self, assets_dir: &Path) -> Result<(), ProvisionError> {
        fs::create_dir_all(assets_dir)
            .map_err(|e| ProvisionError::io(format!("creating {}", assets_dir.display()), e))?;

        let archive_path = assets_dir.join(self.asset.archive_name());
        let url = self.asset.download_url(&self.registry_url);

        info!(
            package = %self.asset.name,
            version = %self.asset.version,
            "downloading editor assets"
        );

        let fetcher = AssetFetcher::new()?;
        fetcher.fetch_to_file(&url, &archive_path)?;

        checksum::verify_file(&archive_path, &self.asset.sha1)?;
        debug!(digest = %self.asset.sha1, "archive digest verified");

        extract::extract_tgz(&archive_path, assets_dir)?;

        // The bundle is expected to unpack to a `package/` root.
        let package_dir = assets_dir.join("package");
        if !dir_is_populated(&package_dir) {
            return Err(ExtractError::Malformed(format!(
                "Archive did not produce {}",
                package_dir.display()
            ))
            .into());
        }

        fs::remove_file(&archive_path)
            .map_err(|e| ProvisionError::io(format!("removing {}", archive_path.display()), e))?;

        Ok(())
    }

    /// Delete the entire cache root tree.
    ///
    /// Idempotent: a missing cache root is a no-op. Filesystem errors
    /// propagate directly; no recovery is attempted.
    pub fn clear_cache(&self) -> Result<(), ProvisionError> {
        if self.cache_root.exists() {
            fs::remove_dir_all(&self.cache_root).map_err(|e| {
                ProvisionError::io(format!("removing {}", self.cache_root.display()), e)
            })?;
            info!(path = %self.cache_root.display(), "asset cache cleared");
        }
        Ok(())
    }
}

/// Ensure the pinned Monaco editor assets are present in the platform cache.
///
/// Convenience wrapper over [`AssetProvisioner::new`] +
/// [`AssetProvisioner::ensure_assets`].
pub fn ensure_assets() -> Result<PathBuf, ProvisionError> {
    AssetProvisioner::new()?.ensure_assets()
}

/// Clear the Monaco editor asset cache in the platform cache directory.
pub fn clear_cache() -> Result<(), ProvisionError> {
    AssetProvisioner::new()?.clear_cache()
}

/// Platform default cache root: `<user cache dir>/monaco-assets`
fn default_cache_root() -> Result<PathBuf, ProvisionError> {
    let base = dirs::cache_dir().ok_or_else(|| {
        ProvisionError::CacheDir("Could not determine platform cache directory".to_string())
    })?;

    Ok(base.join("monaco-assets"))
}

/// Whether a directory exists and contains at least one entry.
fn dir_is_populated(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pinned_version() {
        let asset = AssetVersion::pinned();
        assert_eq!(asset.name, "monaco-editor");
        assert_eq!(asset.version, "0.54.0");
        assert_eq!(asset.sha1.len(), 40);
        assert!(asset.sha1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_download_url() {
        let asset = AssetVersion::pinned();
        assert_eq!(
            asset.download_url(DEFAULT_REGISTRY),
            "https://registry.npmjs.org/monaco-editor/-/monaco-editor-0.54.0.tgz"
        );
        // Trailing slash on the registry is tolerated
        assert_eq!(
            asset.download_url("https://registry.npmjs.org/"),
            "https://registry.npmjs.org/monaco-editor/-/monaco-editor-0.54.0.tgz"
        );
    }

    #[test]
    fn test_cache_layout() {
        let temp = TempDir::new().unwrap();
        let provisioner = AssetProvisioner::with_cache_root(temp.path().to_path_buf());

        assert_eq!(provisioner.cache_root(), temp.path());
        assert_eq!(
            provisioner.assets_dir(),
            temp.path().join("monaco-editor-0.54.0")
        );
        assert_eq!(
            provisioner.package_dir(),
            temp.path().join("monaco-editor-0.54.0").join("package")
        );
    }

    #[test]
    fn test_dir_is_populated() {
        let temp = TempDir::new().unwrap();

        // missing
        assert!(!dir_is_populated(&temp.path().join("missing")));

        // empty
        let empty = temp.path().join("empty");
        fs::create_dir(&empty).unwrap();
        assert!(!dir_is_populated(&empty));

        // non-empty
        let full = temp.path().join("full");
        fs::create_dir(&full).unwrap();
        fs::write(full.join("file"), b"x").unwrap();
        assert!(dir_is_populated(&full));
    }

    #[test]
    fn test_clear_cache_missing_root_is_noop() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("never-created");
        let provisioner = AssetProvisioner::with_cache_root(root.clone());

        provisioner.clear_cache().unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn test_clear_cache_removes_tree() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("cache");
        let nested = root.join("monaco-editor-0.54.0").join("package");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("loader.js"), b"// loader").unwrap();

        let provisioner = AssetProvisioner::with_cache_root(root.clone());
        provisioner.clear_cache().unwrap();

        assert!(!root.exists());
    }
}
