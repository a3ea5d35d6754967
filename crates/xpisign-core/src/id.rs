//! Add-on id derivation
//!
//! The signing service identifies an add-on by an id that is either a
//! brace-wrapped GUID or an email-like string. Manifests do not always
//! carry one in that form, so the id is derived with these rules:
//!
//! 1. an explicit id that is already valid is used as-is
//! 2. an explicit id that becomes valid once prefixed with `@` gets the prefix
//! 3. without an explicit id, `@` + the package name is used if valid

use once_cell::sync::Lazy;
use regex::Regex;

use crate::manifest::Manifest;

static VALID_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(\{[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\}|[a-z0-9\-._]*@[a-z0-9\-._]+)$",
    )
    .expect("valid regex")
});

/// Check whether a string is an id the signing service accepts
#[must_use]
pub fn is_valid_id(id: &str) -> bool {
    VALID_ID.is_match(id)
}

/// Derive the stable add-on id from a manifest
///
/// Returns `None` when no valid id can be produced.
#[must_use]
pub fn derive_id(manifest: &Manifest) -> Option<String> {
    if let Some(id) = manifest.explicit_id() {
        if is_valid_id(id) {
            return Some(id.to_string());
        }
        let prefixed = format!("@{}", id);
        return is_valid_id(&prefixed).then_some(prefixed);
    }

    let name = manifest.name.as_deref()?;
    let prefixed = format!("@{}", name);
    is_valid_id(&prefixed).then_some(prefixed)
}
