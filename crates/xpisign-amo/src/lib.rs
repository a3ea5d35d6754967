//! xpisign AMO client
//!
//! Client for the addons.mozilla.org signing API:
//!
//! - **Upload**: submit an XPI for a given add-on id and version
//! - **Poll**: wait for validation and automatic signing to finish
//! - **Download**: fetch the signed files next to the caller
//!
//! Every request is authenticated with a short-lived JWT signed with the
//! API secret.
//!
//! ## Example
//!
//! ```rust,no_run
//! use xpisign_amo::{AmoClient, ClientConfig, SignRequest, SigningClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = AmoClient::new(ClientConfig::new("user:12345:67", "secret"))?;
//!
//! let result = client
//!     .sign(&SignRequest {
//!         xpi_path: "my-addon-1.0.xpi".into(),
//!         guid: "my-addon@example.com".to_string(),
//!         version: "1.0".to_string(),
//!     })
//!     .await?;
//!
//! println!("signed: {}", result.success);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod status;

pub use auth::JwtAuth;
pub use client::{
    AMO_API_PREFIX, AmoClient, ClientConfig, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_STATUS_CHECK_INTERVAL, DEFAULT_STATUS_CHECK_TIMEOUT, SignRequest, SignResult, SigningClient,
};
pub use error::{AmoError, Result};
pub use status::{SignedFile, StatusOutcome, VersionStatus};
