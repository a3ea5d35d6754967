//! Services the signing workflow depends on
//!
//! Each service is a trait with one production implementation, so tests
//! (or a host process) can swap any of them out through `Collaborators`.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use xpisign_amo::{AmoClient, ClientConfig, SigningClient};
use xpisign_core::{BuildOptions, Manifest};

use crate::error::Result;

/// Reads the manifest of an add-on directory or built XPI
#[async_trait]
pub trait ManifestReader: Send + Sync {
    async fn read(&self, addon_dir: &Path, xpi_path: Option<&Path>) -> Result<Manifest>;
}

/// Packages an add-on into an XPI, returning the archive path
#[async_trait]
pub trait PackageBuilder: Send + Sync {
    async fn build(&self, manifest: &Manifest, options: &BuildOptions) -> Result<PathBuf>;
}

/// Allocates temporary directories
pub trait TempDirProvider: Send + Sync {
    fn allocate(&self, prefix: &str) -> Result<TempDirHandle>;
}

/// Creates signing clients
pub trait ClientFactory: Send + Sync {
    fn create(&self, config: ClientConfig) -> Result<Box<dyn SigningClient>>;
}

type ReleaseFn = Box<dyn FnOnce() -> std::io::Result<()> + Send>;

/// A temporary directory and the callback that removes it
///
/// Dropping the handle leaves the directory on disk; only `release`
/// removes it, and it consumes the handle so it can run at most once.
pub struct TempDirHandle {
    path: PathBuf,
    release: ReleaseFn,
}

impl TempDirHandle {
    pub fn new(
        path: PathBuf,
        release: impl FnOnce() -> std::io::Result<()> + Send + 'static,
    ) -> Self {
        Self {
            path,
            release: Box::new(release),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(self) -> std::io::Result<()> {
        (self.release)()
    }
}

impl fmt::Debug for TempDirHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TempDirHandle")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Manifest reader backed by `xpisign_core::read_manifest`
pub struct FsManifestReader;

#[async_trait]
impl ManifestReader for FsManifestReader {
    async fn read(&self, addon_dir: &Path, xpi_path: Option<&Path>) -> Result<Manifest> {
        Ok(xpisign_core::read_manifest(addon_dir, xpi_path)?)
    }
}

/// Builder producing zip XPIs with `xpisign_core::create_xpi`
pub struct XpiBuilder;

#[async_trait]
impl PackageBuilder for XpiBuilder {
    async fn build(&self, manifest: &Manifest, options: &BuildOptions) -> Result<PathBuf> {
        let manifest = manifest.clone();
        let options = options.clone();
        let path = tokio::task::spawn_blocking(move || xpisign_core::create_xpi(&manifest, &options))
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))??;
        Ok(path)
    }
}

/// Temporary directories under the system temp dir, removed recursively
pub struct SystemTempDirs;

impl TempDirProvider for SystemTempDirs {
    fn allocate(&self, prefix: &str) -> Result<TempDirHandle> {
        let path = tempfile::Builder::new().prefix(prefix).tempdir()?.keep();
        let target = path.clone();
        Ok(TempDirHandle::new(path, move || {
            std::fs::remove_dir_all(&target)
        }))
    }
}

/// Factory for the addons.mozilla.org client
pub struct AmoClientFactory;

impl ClientFactory for AmoClientFactory {
    fn create(&self, config: ClientConfig) -> Result<Box<dyn SigningClient>> {
        Ok(Box::new(AmoClient::new(config)?))
    }
}

/// The set of services one signing run uses
#[derive(Clone)]
pub struct Collaborators {
    pub manifest_reader: Arc<dyn ManifestReader>,
    pub package_builder: Arc<dyn PackageBuilder>,
    pub temp_dirs: Arc<dyn TempDirProvider>,
    pub clients: Arc<dyn ClientFactory>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            manifest_reader: Arc::new(FsManifestReader),
            package_builder: Arc::new(XpiBuilder),
            temp_dirs: Arc::new(SystemTempDirs),
            clients: Arc::new(AmoClientFactory),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_temp_dir_survives_drop() {
        let handle = SystemTempDirs.allocate("tmp-unsigned-xpi-").unwrap();
        let path = handle.path().to_path_buf();

        assert!(path.is_dir());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("tmp-unsigned-xpi-")
        );

        drop(handle);
        assert!(path.is_dir());
        std::fs::remove_dir_all(&path).unwrap();
    }

    #[test]
    fn test_release_removes_contents() {
        let handle = SystemTempDirs.allocate("tmp-unsigned-xpi-").unwrap();
        let path = handle.path().to_path_buf();
        std::fs::create_dir_all(path.join("nested")).unwrap();
        std::fs::write(path.join("nested").join("addon.xpi"), b"zip").unwrap();

        handle.release().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_xpi_builder() {
        let addon = tempfile::TempDir::new().unwrap();
        std::fs::write(
            addon.path().join("manifest.json"),
            r#"{"name": "demo", "version": "0.1", "applications": {"gecko": {"id": "demo@example.com"}}}"#,
        )
        .unwrap();
        let out = tempfile::TempDir::new().unwrap();

        let manifest = FsManifestReader.read(addon.path(), None).await.unwrap();
        let xpi = XpiBuilder
            .build(
                &manifest,
                &BuildOptions {
                    addon_dir: addon.path().to_path_buf(),
                    destination: out.path().to_path_buf(),
                },
            )
            .await
            .unwrap();

        assert_eq!(xpi, out.path().join("demoexample.com-0.1.xpi"));
        assert!(xpi.is_file());
    }

    #[test]
    fn test_amo_client_factory_rejects_bad_prefix() {
        let mut config = ClientConfig::new("k", "s");
        config.api_url_prefix = "::not a url".to_string();
        assert!(AmoClientFactory.create(config).is_err());
    }
}
