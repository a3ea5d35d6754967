//! CLI commands

pub mod sign;
pub mod xpi;
