//! Version status responses
//!
//! After an upload the signing API reports progress on the version
//! resource. The add-on goes through validation first, then automatic
//! review, then signing.

use serde::{Deserialize, Deserializer, Serialize};

/// Status of an uploaded add-on version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionStatus {
    #[serde(default)]
    pub guid: Option<String>,

    #[serde(default)]
    pub active: bool,

    /// Validation has finished
    #[serde(default)]
    pub processed: bool,

    /// Validation passed
    #[serde(default)]
    pub valid: bool,

    /// Review has happened (a boolean or a review date, depending on the server)
    #[serde(default, deserialize_with = "truthy")]
    pub reviewed: bool,

    #[serde(default)]
    pub files: Vec<SignedFile>,

    #[serde(default)]
    pub validation_url: Option<String>,

    #[serde(default)]
    pub validation_results: Option<serde_json::Value>,
}

/// A file attached to a version
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignedFile {
    #[serde(default)]
    pub download_url: String,

    #[serde(default)]
    pub signed: bool,
}

/// What a status response means for the signing workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Keep polling
    Pending,
    /// All files are signed and can be downloaded
    Signed,
    /// Validation failed
    ValidationFailed,
    /// Reviewed, but the files were not signed
    NotSigned,
}

impl VersionStatus {
    pub fn outcome(&self) -> StatusOutcome {
        if !self.processed {
            return StatusOutcome::Pending;
        }
        if !self.valid {
            return StatusOutcome::ValidationFailed;
        }
        if !self.files.is_empty() && self.files.iter().all(|f| f.signed) {
            return StatusOutcome::Signed;
        }
        if self.reviewed {
            StatusOutcome::NotSigned
        } else {
            StatusOutcome::Pending
        }
    }

    /// Signed files that can be downloaded
    pub fn signed_files(&self) -> impl Iterator<Item = &SignedFile> {
        self.files
            .iter()
            .filter(|f| f.signed && !f.download_url.is_empty())
    }
}

fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => false,
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    })
}
