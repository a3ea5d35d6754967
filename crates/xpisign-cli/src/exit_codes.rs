//! Process exit codes
//!
//! Every failure (bad arguments, missing credentials, packaging or signing
//! errors, an unsigned result) exits with `ERROR`.

/// Success - the add-on was signed
pub const SUCCESS: i32 = 0;

/// Any failure
pub const ERROR: i32 = 1;
