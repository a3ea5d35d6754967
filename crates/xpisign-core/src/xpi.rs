//! XPI creation and inspection
//!
//! An XPI is a plain zip archive of the add-on directory. Hidden files,
//! previously built `.xpi` files and anything matched by a `.jpmignore`
//! file at the add-on root are left out.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{CoreError, Result};
use crate::id::derive_id;
use crate::manifest::Manifest;

/// Ignore file read from the add-on root
pub const IGNORE_FILE: &str = ".jpmignore";

/// Options for building an XPI
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Add-on source directory
    pub addon_dir: PathBuf,
    /// Directory the XPI is written to
    pub destination: PathBuf,
}

/// Information about a file in an XPI
#[derive(Debug, Clone)]
pub struct XpiEntry {
    /// Relative path within the archive
    pub path: String,
    /// Uncompressed size in bytes
    pub size: u64,
    /// Whether this is a directory
    pub is_dir: bool,
}

/// Package an add-on directory into an XPI
///
/// Returns the path to the created archive, which is always
/// `options.destination/<xpi_file_name(manifest)>`.
pub fn create_xpi(manifest: &Manifest, options: &BuildOptions) -> Result<PathBuf> {
    if !options.addon_dir.is_dir() {
        return Err(CoreError::AddonNotFound {
            path: options.addon_dir.display().to_string(),
        });
    }

    std::fs::create_dir_all(&options.destination)?;
    let output = options.destination.join(xpi_file_name(manifest));

    let ignore = IgnoreRules::load(&options.addon_dir)?;
    let files = collect_files(&options.addon_dir, &ignore)?;

    let file = File::create(&output)?;
    let mut zip = ZipWriter::new(file);
    let file_options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (rel_path, abs_path) in &files {
        let content = std::fs::read(abs_path)?;
        zip.start_file(rel_path.as_str(), file_options)?;
        zip.write_all(&content)?;
    }

    zip.finish()?;

    tracing::debug!(
        "Packaged {} file(s) from {} into {}",
        files.len(),
        options.addon_dir.display(),
        output.display()
    );

    Ok(output)
}

/// List the entries of an XPI
pub fn list_xpi(xpi_path: &Path) -> Result<Vec<XpiEntry>> {
    let file = File::open(xpi_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        entries.push(XpiEntry {
            path: entry.name().to_string(),
            size: entry.size(),
            is_dir: entry.is_dir(),
        });
    }

    Ok(entries)
}

/// File name of the XPI built for a manifest
///
/// `<id>-<version>.xpi`, with `@`, `{` and `}` removed from the id. Both
/// parts are reduced to a single path component.
#[must_use]
pub fn xpi_file_name(manifest: &Manifest) -> String {
    let base = derive_id(manifest)
        .or_else(|| manifest.name.clone())
        .unwrap_or_default();

    let base = file_name_part(&base).unwrap_or_else(|| "addon".to_string());
    let version = file_name_part(&manifest.version).unwrap_or_else(|| "0".to_string());

    format!("{}-{}.xpi", base, version)
}

/// Drop id punctuation, turn separators into `-`, strip leading dots
fn file_name_part(raw: &str) -> Option<String> {
    let part: String = raw
        .chars()
        .filter(|c| !matches!(c, '@' | '{' | '}'))
        .map(|c| if matches!(c, '/' | '\\') { '-' } else { c })
        .collect();

    let part = part.trim_start_matches(['.', '-']);
    (!part.is_empty()).then(|| part.to_string())
}

/// Glob patterns excluded from packaging
struct IgnoreRules {
    patterns: Vec<glob::Pattern>,
}

impl IgnoreRules {
    fn load(addon_dir: &Path) -> Result<Self> {
        let path = addon_dir.join(IGNORE_FILE);
        if !path.is_file() {
            return Ok(Self {
                patterns: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(&path)?;
        let mut patterns = Vec::new();
        for line in content.lines() {
            let line = line.trim().trim_end_matches('/');
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let pattern = glob::Pattern::new(line).map_err(|e| CoreError::IgnorePattern {
                pattern: line.to_string(),
                message: e.to_string(),
            })?;
            patterns.push(pattern);
        }

        Ok(Self { patterns })
    }

    /// A path is ignored when it, or any of its parent directories, matches
    fn is_ignored(&self, rel_path: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }

        let mut prefix = String::new();
        for component in rel_path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(component);
            if self.patterns.iter().any(|p| p.matches(&prefix)) {
                return true;
            }
        }
        false
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Collect files to package as (archive path, filesystem path), sorted
fn collect_files(root: &Path, ignore: &IgnoreRules) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e));

    for entry in walker {
        let entry = entry.map_err(|e| CoreError::Io(std::io::Error::other(e.to_string())))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let rel_path = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");

        if rel_path.ends_with(".xpi") || ignore.is_ignored(&rel_path) {
            continue;
        }

        files.push((rel_path, entry.path().to_path_buf()));
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_addon(dir: &Path) {
        std::fs::write(
            dir.join("package.json"),
            r#"{"id": "test-addon@example.com", "name": "test-addon", "version": "1.0.0"}"#,
        )
        .unwrap();
        std::fs::write(dir.join("index.js"), "console.log('hi');\n").unwrap();

        let data_dir = dir.join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(data_dir.join("panel.html"), "<html></html>\n").unwrap();
    }

    fn entry_paths(xpi: &Path) -> Vec<String> {
        list_xpi(xpi).unwrap().into_iter().map(|e| e.path).collect()
    }

    #[test]
    fn test_create_xpi() {
        let temp = TempDir::new().unwrap();
        let addon_dir = temp.path().join("addon");
        std::fs::create_dir_all(&addon_dir).unwrap();
        create_test_addon(&addon_dir);

        let manifest = crate::read_manifest(&addon_dir, None).unwrap();
        let options = BuildOptions {
            addon_dir: addon_dir.clone(),
            destination: temp.path().join("out"),
        };

        let xpi = create_xpi(&manifest, &options).unwrap();
        assert_eq!(
            xpi,
            temp.path().join("out").join("test-addonexample.com-1.0.0.xpi")
        );
        assert!(xpi.exists());

        let paths = entry_paths(&xpi);
        assert_eq!(paths, vec!["data/panel.html", "index.js", "package.json"]);

        // The built archive can be read back as a manifest source
        let packed = crate::read_manifest(temp.path(), Some(&xpi)).unwrap();
        assert_eq!(packed.version, "1.0.0");
    }

    #[test]
    fn test_hidden_and_xpi_files_skipped() {
        let temp = TempDir::new().unwrap();
        create_test_addon(temp.path());
        std::fs::write(temp.path().join(".DS_Store"), "junk").unwrap();
        std::fs::create_dir_all(temp.path().join(".git")).unwrap();
        std::fs::write(temp.path().join(".git").join("HEAD"), "ref").unwrap();
        std::fs::write(temp.path().join("old-build.xpi"), "zip").unwrap();

        let manifest = crate::read_manifest(temp.path(), None).unwrap();
        let out = TempDir::new().unwrap();
        let xpi = create_xpi(
            &manifest,
            &BuildOptions {
                addon_dir: temp.path().to_path_buf(),
                destination: out.path().to_path_buf(),
            },
        )
        .unwrap();

        let paths = entry_paths(&xpi);
        assert!(!paths.iter().any(|p| p.starts_with('.') || p.contains("/.")));
        assert!(!paths.iter().any(|p| p.ends_with(".xpi")));
        assert_eq!(paths.len(), 3);
    }

    #[test]
    fn test_ignore_file() {
        let temp = TempDir::new().unwrap();
        create_test_addon(temp.path());
        std::fs::create_dir_all(temp.path().join("test")).unwrap();
        std::fs::write(temp.path().join("test").join("test-main.js"), "").unwrap();
        std::fs::write(temp.path().join("notes.md"), "").unwrap();
        std::fs::write(temp.path().join(IGNORE_FILE), "# dev only\ntest/\n*.md\n").unwrap();

        let manifest = crate::read_manifest(temp.path(), None).unwrap();
        let out = TempDir::new().unwrap();
        let xpi = create_xpi(
            &manifest,
            &BuildOptions {
                addon_dir: temp.path().to_path_buf(),
                destination: out.path().to_path_buf(),
            },
        )
        .unwrap();

        let paths = entry_paths(&xpi);
        assert_eq!(paths, vec!["data/panel.html", "index.js", "package.json"]);
    }

    #[test]
    fn test_invalid_ignore_pattern() {
        let temp = TempDir::new().unwrap();
        create_test_addon(temp.path());
        std::fs::write(temp.path().join(IGNORE_FILE), "[unclosed\n").unwrap();

        let manifest = crate::read_manifest(temp.path(), None).unwrap();
        let err = create_xpi(
            &manifest,
            &BuildOptions {
                addon_dir: temp.path().to_path_buf(),
                destination: temp.path().join("out"),
            },
        )
        .unwrap_err();

        assert!(matches!(err, CoreError::IgnorePattern { .. }));
    }

    #[test]
    fn test_xpi_file_name() {
        let guid = Manifest {
            id: Some("{8f8a3e54-2c5a-4a3f-9c8e-0d1b2c3d4e5f}".to_string()),
            version: "0.3".to_string(),
            ..Default::default()
        };
        assert_eq!(
            xpi_file_name(&guid),
            "8f8a3e54-2c5a-4a3f-9c8e-0d1b2c3d4e5f-0.3.xpi"
        );

        let named = Manifest {
            name: Some("my-addon".to_string()),
            version: "2.0".to_string(),
            ..Default::default()
        };
        assert_eq!(xpi_file_name(&named), "my-addon-2.0.xpi");

        let anonymous = Manifest {
            version: "1.0".to_string(),
            ..Default::default()
        };
        assert_eq!(xpi_file_name(&anonymous), "addon-1.0.xpi");
    }

    #[test]
    fn test_xpi_file_name_stays_in_destination() {
        let escaping = Manifest {
            name: Some("../../escaped".to_string()),
            version: "1.0".to_string(),
            ..Default::default()
        };
        assert_eq!(xpi_file_name(&escaping), "escaped-1.0.xpi");

        let scoped = Manifest {
            name: Some("@scope/addon".to_string()),
            version: "../1.0".to_string(),
            ..Default::default()
        };
        assert_eq!(xpi_file_name(&scoped), "scope-addon-1.0.xpi");

        let windows = Manifest {
            name: Some("..\\evil".to_string()),
            version: "2.0".to_string(),
            ..Default::default()
        };
        assert_eq!(xpi_file_name(&windows), "evil-2.0.xpi");
    }

    #[test]
    fn test_create_xpi_with_scoped_name() {
        let addon = TempDir::new().unwrap();
        std::fs::write(
            addon.path().join("package.json"),
            r#"{"name": "@scope/addon", "version": "1.0"}"#,
        )
        .unwrap();
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("a").join("b");

        let manifest = crate::read_manifest(addon.path(), None).unwrap();
        let xpi = create_xpi(
            &manifest,
            &BuildOptions {
                addon_dir: addon.path().to_path_buf(),
                destination: destination.clone(),
            },
        )
        .unwrap();

        assert_eq!(xpi.parent(), Some(destination.as_path()));
        assert_eq!(xpi, destination.join("scope-addon-1.0.xpi"));
        assert!(xpi.is_file());
    }
}
