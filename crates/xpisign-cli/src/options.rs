//! Signing options and their defaults
//!
//! Options come from several layers, lowest to highest precedence:
//!
//! 1. built-in defaults (current directory, the public AMO API)
//! 2. the YAML configuration file
//! 3. environment variables and command-line flags
//!
//! Every layer is a `SignOptions` where unset fields are `None`; `merge`
//! lays one over another and `resolve` fills in the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use xpisign_amo::{AMO_API_PREFIX, ClientConfig};

use crate::error::{Result, SignError};

/// Flag names of the required credentials, as reported to the user
pub const API_KEY_FLAG: &str = "--api-key";
pub const API_SECRET_FLAG: &str = "--api-secret";

/// Options of one signing run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignOptions {
    #[serde(default)]
    pub addon_dir: Option<PathBuf>,

    /// Sign this already built XPI instead of packaging `addon_dir`
    #[serde(default)]
    pub xpi: Option<PathBuf>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_secret: Option<String>,

    #[serde(default)]
    pub api_url_prefix: Option<String>,

    #[serde(default)]
    pub verbose: Option<bool>,

    /// Signed status check timeout in milliseconds
    #[serde(default)]
    pub timeout: Option<u64>,
}

/// Options with defaults applied and credentials checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub addon_dir: PathBuf,
    pub xpi: Option<PathBuf>,
    pub api_key: String,
    pub api_secret: String,
    pub api_url_prefix: String,
    pub verbose: bool,
    pub timeout: Option<Duration>,
}

impl SignOptions {
    /// Lay `overrides` over `self`; fields set in `overrides` win
    #[must_use]
    pub fn merge(self, overrides: SignOptions) -> SignOptions {
        SignOptions {
            addon_dir: overrides.addon_dir.or(self.addon_dir),
            xpi: overrides.xpi.or(self.xpi),
            api_key: overrides.api_key.or(self.api_key),
            api_secret: overrides.api_secret.or(self.api_secret),
            api_url_prefix: overrides.api_url_prefix.or(self.api_url_prefix),
            verbose: overrides.verbose.or(self.verbose),
            timeout: overrides.timeout.or(self.timeout),
        }
    }

    /// Flags of required credentials that are absent or empty
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        [
            (self.api_key.as_deref(), API_KEY_FLAG),
            (self.api_secret.as_deref(), API_SECRET_FLAG),
        ]
        .into_iter()
        .filter(|(value, _)| value.is_none_or(str::is_empty))
        .map(|(_, flag)| flag)
        .collect()
    }

    /// Apply defaults and check that both credentials are present
    pub fn resolve(self) -> Result<ResolvedOptions> {
        let missing = self.missing_credentials();
        if !missing.is_empty() {
            return Err(SignError::MissingCredentials { flags: missing });
        }

        let addon_dir = match self.addon_dir {
            Some(dir) => dir,
            None => std::env::current_dir()?,
        };

        Ok(ResolvedOptions {
            addon_dir,
            xpi: self.xpi,
            api_key: self.api_key.unwrap_or_default(),
            api_secret: self.api_secret.unwrap_or_default(),
            api_url_prefix: self
                .api_url_prefix
                .unwrap_or_else(|| AMO_API_PREFIX.to_string()),
            verbose: self.verbose.unwrap_or(false),
            // Zero means "use the client default"
            timeout: self
                .timeout
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
        })
    }
}

impl ResolvedOptions {
    /// Configuration of the signing client for these options
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.api_key, &self.api_secret);
        config.api_url_prefix = self.api_url_prefix.clone();
        config.debug_logging = self.verbose;
        config.signed_status_check_timeout = self.timeout;
        config
    }
}

/// The YAML configuration file
pub struct ConfigFile;

impl ConfigFile {
    /// Default location: `<config dir>/xpisign/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("xpisign").join("config.yaml"))
    }

    /// Load options from a file
    pub fn load_from(path: &Path) -> Result<SignOptions> {
        let content = std::fs::read_to_string(path).map_err(|e| SignError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        if content.trim().is_empty() {
            return Ok(SignOptions::default());
        }

        serde_yaml::from_str(&content).map_err(|e| SignError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load the explicit file, or the default one when it exists
    pub fn load(explicit: Option<&Path>) -> Result<SignOptions> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load_from(&path)
            }
            _ => Ok(SignOptions::default()),
        }
    }
}
