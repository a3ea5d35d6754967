//! xpisign Core - Extension metadata and packaging
//!
//! This crate provides the building blocks the signing workflow needs
//! before anything is sent over the network:
//! - `Manifest`: extension metadata read from `package.json` or `manifest.json`
//! - `derive_id`: the stable add-on id submitted alongside the package
//! - `create_xpi`: packaging an add-on directory into an `.xpi` archive

pub mod error;
pub mod id;
pub mod manifest;
pub mod xpi;

pub use error::{CoreError, Result};
pub use id::{derive_id, is_valid_id};
pub use manifest::{Manifest, read_manifest};
pub use xpi::{BuildOptions, XpiEntry, create_xpi, list_xpi, xpi_file_name};
