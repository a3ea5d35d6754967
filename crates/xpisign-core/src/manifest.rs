//! Extension manifest loading
//!
//! Both legacy SDK add-ons (`package.json`) and WebExtensions
//! (`manifest.json`) are supported. The manifest is read either from an
//! add-on source directory or from inside an already built XPI.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{CoreError, Result};

/// Manifest file names, in lookup order
pub const MANIFEST_FILES: [&str; 2] = ["package.json", "manifest.json"];

/// Extension metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    /// Explicit add-on id (SDK add-ons)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Package name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Human readable title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Extension version, submitted as-is to the signing service
    #[serde(default)]
    pub version: String,

    /// WebExtension application settings (legacy key)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Applications>,

    /// WebExtension application settings
    #[serde(
        default,
        rename = "browser_specific_settings",
        skip_serializing_if = "Option::is_none"
    )]
    pub browser_specific_settings: Option<Applications>,

    /// Every other manifest field, preserved untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Applications {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gecko: Option<GeckoSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeckoSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Manifest {
    /// Parse a manifest from raw JSON bytes
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let manifest: Manifest = serde_json::from_slice(data)?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(CoreError::MissingField {
                field: "version".to_string(),
            });
        }
        Ok(())
    }

    /// The id declared by the manifest, if any
    ///
    /// `id` wins over the WebExtension gecko id.
    pub fn explicit_id(&self) -> Option<&str> {
        if let Some(id) = self.id.as_deref() {
            return Some(id);
        }
        self.browser_specific_settings
            .as_ref()
            .or(self.applications.as_ref())
            .and_then(|apps| apps.gecko.as_ref())
            .and_then(|gecko| gecko.id.as_deref())
    }

    /// Name used for display, falling back through title and name
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or("add-on")
    }
}

/// Read the manifest of an add-on
///
/// When `xpi_path` is given the manifest is read from inside that archive,
/// otherwise from `addon_dir`.
pub fn read_manifest(addon_dir: &Path, xpi_path: Option<&Path>) -> Result<Manifest> {
    match xpi_path {
        Some(xpi) => read_from_xpi(xpi),
        None => read_from_dir(addon_dir),
    }
}

fn read_from_dir(addon_dir: &Path) -> Result<Manifest> {
    if !addon_dir.is_dir() {
        return Err(CoreError::AddonNotFound {
            path: addon_dir.display().to_string(),
        });
    }

    for file_name in MANIFEST_FILES {
        let path = addon_dir.join(file_name);
        if path.is_file() {
            tracing::debug!("Reading manifest from {}", path.display());
            let data = std::fs::read(&path)?;
            return Manifest::from_slice(&data);
        }
    }

    Err(CoreError::ManifestNotFound {
        path: addon_dir.display().to_string(),
    })
}

fn read_from_xpi(xpi_path: &Path) -> Result<Manifest> {
    let file = File::open(xpi_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for file_name in MANIFEST_FILES {
        match archive.by_name(file_name) {
            Ok(mut entry) => {
                tracing::debug!("Reading {} from {}", file_name, xpi_path.display());
                let mut data = Vec::new();
                entry.read_to_end(&mut data)?;
                return Manifest::from_slice(&data);
            }
            Err(zip::result::ZipError::FileNotFound) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Err(CoreError::ManifestNotFound {
        path: xpi_path.display().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_read_package_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("package.json"),
            r#"{"id": "my-addon@example.com", "name": "my-addon", "version": "1.0", "main": "index.js"}"#,
        )
        .unwrap();

        let manifest = read_manifest(temp.path(), None).unwrap();
        assert_eq!(manifest.version, "1.0");
        assert_eq!(manifest.explicit_id(), Some("my-addon@example.com"));
        assert_eq!(manifest.extra.get("main").unwrap(), "index.js");
    }

    #[test]
    fn test_package_json_wins_over_manifest_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), r#"{"version": "2.0"}"#).unwrap();
        std::fs::write(temp.path().join("manifest.json"), r#"{"version": "3.0"}"#).unwrap();

        let manifest = read_manifest(temp.path(), None).unwrap();
        assert_eq!(manifest.version, "2.0");
    }

    #[test]
    fn test_webextension_gecko_id() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("manifest.json"),
            r#"{
                "manifest_version": 2,
                "name": "Borderify",
                "version": "1.0.1",
                "applications": {"gecko": {"id": "borderify@example.com"}}
            }"#,
        )
        .unwrap();

        let manifest = read_manifest(temp.path(), None).unwrap();
        assert_eq!(manifest.explicit_id(), Some("borderify@example.com"));
        assert_eq!(manifest.display_name(), "Borderify");
    }

    #[test]
    fn test_browser_specific_settings_preferred() {
        let manifest = Manifest::from_slice(
            br#"{
                "version": "1.0",
                "applications": {"gecko": {"id": "old@example.com"}},
                "browser_specific_settings": {"gecko": {"id": "new@example.com"}}
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.explicit_id(), Some("new@example.com"));
    }

    #[test]
    fn test_missing_version() {
        let err = Manifest::from_slice(br#"{"name": "no-version"}"#).unwrap_err();
        assert!(matches!(err, CoreError::MissingField { ref field } if field == "version"));
    }

    #[test]
    fn test_missing_manifest() {
        let temp = TempDir::new().unwrap();
        let err = read_manifest(temp.path(), None).unwrap_err();
        assert!(matches!(err, CoreError::ManifestNotFound { .. }));
    }

    #[test]
    fn test_missing_addon_dir() {
        let temp = TempDir::new().unwrap();
        let err = read_manifest(&temp.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, CoreError::AddonNotFound { .. }));
    }

    #[test]
    fn test_read_from_xpi() {
        let temp = TempDir::new().unwrap();
        let xpi_path = temp.path().join("addon.xpi");

        let file = File::create(&xpi_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("manifest.json", options).unwrap();
        zip.write_all(br#"{"name": "packed", "version": "4.2"}"#).unwrap();
        zip.finish().unwrap();

        // The addon directory is ignored when an XPI is given
        let manifest = read_manifest(&temp.path().join("ignored"), Some(&xpi_path)).unwrap();
        assert_eq!(manifest.version, "4.2");
        assert_eq!(manifest.name.as_deref(), Some("packed"));
    }

    #[test]
    fn test_xpi_without_manifest() {
        let temp = TempDir::new().unwrap();
        let xpi_path = temp.path().join("empty.xpi");

        let file = File::create(&xpi_path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hello").unwrap();
        zip.finish().unwrap();

        let err = read_manifest(temp.path(), Some(&xpi_path)).unwrap_err();
        assert!(matches!(err, CoreError::ManifestNotFound { .. }));
    }
}
