//! Signing API client
//!
//! `SigningClient` is the seam the signing workflow depends on;
//! `AmoClient` is the implementation talking to addons.mozilla.org.

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::auth::JwtAuth;
use crate::error::{AmoError, Result};
use crate::status::{SignedFile, StatusOutcome, VersionStatus};

/// Default signing API location
pub const AMO_API_PREFIX: &str = "https://addons.mozilla.org/api/v3";

/// How long to wait for an upload to be signed
pub const DEFAULT_STATUS_CHECK_TIMEOUT: Duration = Duration::from_secs(120);

/// Delay between two status checks
pub const DEFAULT_STATUS_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Default connect timeout, and whole-request timeout of status checks
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const XPI_MIME_TYPE: &str = "application/x-xpinstall";

/// Configuration of a signing client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_secret: String,
    pub api_url_prefix: String,
    /// Emit `debug` messages
    pub debug_logging: bool,
    /// Falls back to `DEFAULT_STATUS_CHECK_TIMEOUT`
    pub signed_status_check_timeout: Option<Duration>,
    pub status_check_interval: Duration,
    /// Connect timeout of every request and whole-request timeout of status
    /// checks. Uploads and downloads are otherwise unbounded.
    pub request_timeout: Duration,
    /// Where signed files are saved (current directory when unset)
    pub download_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            api_url_prefix: AMO_API_PREFIX.to_string(),
            debug_logging: false,
            signed_status_check_timeout: None,
            status_check_interval: DEFAULT_STATUS_CHECK_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            download_dir: None,
        }
    }
}

/// A package to sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    pub xpi_path: PathBuf,
    pub guid: String,
    pub version: String,
}

/// Outcome of a signing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResult {
    pub success: bool,
    #[serde(default)]
    pub downloaded_files: Vec<PathBuf>,
}

impl SignResult {
    pub fn failed() -> Self {
        Self::default()
    }

    pub fn signed(downloaded_files: Vec<PathBuf>) -> Self {
        Self {
            success: true,
            downloaded_files,
        }
    }
}

/// Remote signing service
///
/// Implementations must be Send + Sync so several signings can run from
/// one host process.
#[async_trait]
pub trait SigningClient: Send + Sync {
    /// Upload, wait for the signature, download the signed files
    async fn sign(&self, request: &SignRequest) -> Result<SignResult>;

    /// Log a debug message when debug logging is enabled
    fn debug(&self, message: &str);
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    url: Option<String>,
}

/// addons.mozilla.org signing API client
pub struct AmoClient {
    config: ClientConfig,
    auth: JwtAuth,
    http: reqwest::Client,
}

impl AmoClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        Url::parse(&config.api_url_prefix).map_err(|e| AmoError::InvalidUrl {
            url: config.api_url_prefix.clone(),
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| AmoError::NetworkError {
                message: e.to_string(),
            })?;

        let auth = JwtAuth::new(&config.api_key, &config.api_secret);

        Ok(Self { config, auth, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{prefix}/addons/{guid}/versions/{version}/`
    fn version_url(&self, guid: &str, version: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url_prefix)?;
        url.path_segments_mut()
            .map_err(|_| AmoError::InvalidUrl {
                url: self.config.api_url_prefix.clone(),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["addons", guid, "versions", version, ""]);
        Ok(url)
    }

    /// Upload the XPI. Returns the status URL, or `None` if the version
    /// already exists.
    async fn upload(&self, request: &SignRequest) -> Result<Option<String>> {
        let url = self.version_url(&request.guid, &request.version)?;
        let data = tokio::fs::read(&request.xpi_path).await?;
        let file_name = request
            .xpi_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "addon.xpi".to_string());

        tracing::info!("Uploading {} ({} bytes)", file_name, data.len());
        self.debug(&format!("PUT {}", url));

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(XPI_MIME_TYPE)?;
        let form = Form::new().part("upload", part);

        let response = self
            .http
            .put(url.clone())
            .header(AUTHORIZATION, self.auth.header_value()?)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        self.debug(&format!("upload response: {}", status));

        match status {
            StatusCode::CONFLICT => {
                tracing::error!(
                    "Version {} of {} already exists",
                    request.version,
                    request.guid
                );
                Ok(None)
            }
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                let body: UploadResponse = response.json().await?;
                Ok(Some(body.url.unwrap_or_else(|| url.to_string())))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                let text = response.text().await.unwrap_or_default();
                Err(AmoError::AuthFailed {
                    message: format!("{} {}", status.as_u16(), text.trim()),
                })
            }
            _ => {
                let text = response.text().await.unwrap_or_default();
                Err(AmoError::HttpError {
                    status: status.as_u16(),
                    message: format!("Upload to {} failed: {}", url, text.trim()),
                })
            }
        }
    }

    /// Fetch the current status of an upload
    pub async fn check_status(&self, status_url: &str) -> Result<VersionStatus> {
        let response = self.get(status_url, Some(self.config.request_timeout)).await?;
        Ok(response.json().await?)
    }

    /// Poll until the upload is signed or rejected, then download the
    /// signed files. Only the polling is bounded by the status check timeout.
    async fn wait_for_signed(&self, status_url: &str) -> Result<SignResult> {
        let timeout = self
            .config
            .signed_status_check_timeout
            .unwrap_or(DEFAULT_STATUS_CHECK_TIMEOUT);

        let status = tokio::time::timeout(timeout, self.poll_status(status_url))
            .await
            .map_err(|_| AmoError::SigningTimeout { timeout })??;

        match status.outcome() {
            StatusOutcome::Signed => {
                let files: Vec<_> = status.signed_files().cloned().collect();
                let downloaded = self.download_signed_files(&files).await?;
                Ok(SignResult::signed(downloaded))
            }
            StatusOutcome::ValidationFailed => {
                tracing::error!("Your add-on failed validation");
                if let Some(validation_url) = &status.validation_url {
                    tracing::error!("Validation results: {}", validation_url);
                }
                if let Some(results) = &status.validation_results {
                    self.debug(&format!("validation results: {}", results));
                }
                Ok(SignResult::failed())
            }
            StatusOutcome::NotSigned | StatusOutcome::Pending => {
                tracing::error!(
                    "Your add-on passed validation but was not signed; it may require manual review"
                );
                Ok(SignResult::failed())
            }
        }
    }

    /// Check the status until it is no longer pending
    async fn poll_status(&self, status_url: &str) -> Result<VersionStatus> {
        loop {
            let status = self.check_status(status_url).await?;
            let outcome = status.outcome();
            self.debug(&format!(
                "status: processed={} valid={} reviewed={} files={} -> {:?}",
                status.processed,
                status.valid,
                status.reviewed,
                status.files.len(),
                outcome
            ));

            if outcome != StatusOutcome::Pending {
                return Ok(status);
            }
            tokio::time::sleep(self.config.status_check_interval).await;
        }
    }

    async fn download_signed_files(&self, files: &[SignedFile]) -> Result<Vec<PathBuf>> {
        let dir = match &self.config.download_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        tokio::fs::create_dir_all(&dir).await?;

        let mut downloaded = Vec::with_capacity(files.len());
        for file in files {
            let dest = dir.join(file_name_from_url(&file.download_url)?);
            self.download_file(&file.download_url, &dest).await?;
            tracing::info!("Downloaded: {}", dest.display());
            downloaded.push(dest);
        }

        Ok(downloaded)
    }

    async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        let response = self.get(url, None).await?;
        let bytes = response.bytes().await?;
        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    /// Authenticated GET that fails on non-success statuses
    async fn get(&self, url: &str, timeout: Option<Duration>) -> Result<reqwest::Response> {
        self.debug(&format!("GET {}", url));

        let mut request = self
            .http
            .get(url)
            .header(AUTHORIZATION, self.auth.header_value()?);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AmoError::AuthFailed {
                message: format!("Access denied to {}", url),
            });
        }
        if !status.is_success() {
            return Err(AmoError::HttpError {
                status: status.as_u16(),
                message: format!("Request to {} failed", url),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl SigningClient for AmoClient {
    async fn sign(&self, request: &SignRequest) -> Result<SignResult> {
        match self.upload(request).await? {
            Some(status_url) => self.wait_for_signed(&status_url).await,
            None => Ok(SignResult::failed()),
        }
    }

    fn debug(&self, message: &str) {
        if self.config.debug_logging {
            tracing::debug!("[amo] {}", message);
        }
    }
}

/// Last path segment of a download URL
fn file_name_from_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| AmoError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(String::from)
        .ok_or_else(|| AmoError::InvalidResponse {
            message: format!("Cannot determine file name from {}", url),
        })
}
