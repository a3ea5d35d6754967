//! Sign command - submit an add-on to the signing API
//!
//! The workflow is strictly sequential: resolve options, read the
//! manifest, use the given XPI or build one in a temporary directory,
//! sign it, then remove the temporary directory.
//!
//! The temporary directory is only removed after a successful signing
//! call. When signing fails it is left on disk.

use clap::Args;
use console::style;
use std::io::Write;
use std::path::PathBuf;
use xpisign_amo::{SignRequest, SignResult};
use xpisign_core::{BuildOptions, Manifest, derive_id};

use crate::collaborators::{Collaborators, TempDirHandle};
use crate::error::{Result, SignError};
use crate::exit_codes;
use crate::options::{ResolvedOptions, SignOptions};

/// Prefix of the temporary directory unsigned XPIs are built in
pub const TEMP_DIR_PREFIX: &str = "tmp-unsigned-xpi-";

/// Command-line arguments of `xpisign sign`
#[derive(Args, Debug, Clone, Default)]
pub struct SignArgs {
    /// API key (JWT issuer) from addons.mozilla.org
    #[arg(long, env = "AMO_API_KEY")]
    pub api_key: Option<String>,

    /// API secret (JWT secret) from addons.mozilla.org
    #[arg(long, env = "AMO_API_SECRET", hide_env_values = true)]
    pub api_secret: Option<String>,

    /// Add-on source directory (defaults to the current directory)
    #[arg(long)]
    pub addon_dir: Option<PathBuf>,

    /// Sign this XPI instead of packaging the add-on directory
    #[arg(long)]
    pub xpi: Option<PathBuf>,

    /// Signing API URL prefix
    #[arg(long, env = "AMO_API_URL_PREFIX")]
    pub api_url_prefix: Option<String>,

    /// Verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Milliseconds to wait for the add-on to be signed (0: client default)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Configuration file (defaults to <config dir>/xpisign/config.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

impl SignArgs {
    /// Options set on the command line
    pub fn to_options(&self) -> SignOptions {
        SignOptions {
            addon_dir: self.addon_dir.clone(),
            xpi: self.xpi.clone(),
            api_key: self.api_key.clone(),
            api_secret: self.api_secret.clone(),
            api_url_prefix: self.api_url_prefix.clone(),
            verbose: self.verbose.then_some(true),
            timeout: self.timeout,
        }
    }
}

/// The package that will be submitted
#[derive(Debug)]
pub struct XpiConfig {
    pub manifest: Manifest,
    pub xpi_path: PathBuf,
    /// Present only when the XPI was built into a temporary directory
    pub cleanup: Option<TempDirHandle>,
}

/// Write the missing-option report: a blank line, one line per flag,
/// a blank line
pub fn report_missing_credentials(out: &mut impl Write, flags: &[&str]) -> std::io::Result<()> {
    writeln!(out)?;
    for flag in flags {
        writeln!(out, "  error: missing required option `{}'", flag)?;
    }
    writeln!(out)
}

/// Apply defaults and check credentials, reporting missing ones to stderr
pub fn validate_options(options: SignOptions) -> Result<ResolvedOptions> {
    options.resolve().inspect_err(|err| {
        if let SignError::MissingCredentials { flags } = err {
            let _ = report_missing_credentials(&mut std::io::stderr().lock(), flags);
        }
    })
}

/// Use the given XPI, or build one into a fresh temporary directory
pub async fn acquire_package(
    manifest: Manifest,
    options: &ResolvedOptions,
    collaborators: &Collaborators,
) -> Result<XpiConfig> {
    if let Some(xpi) = &options.xpi {
        println!("{} {}", style("Signing XPI:").cyan().bold(), xpi.display());
        return Ok(XpiConfig {
            manifest,
            xpi_path: xpi.clone(),
            cleanup: None,
        });
    }

    let temp_dir = collaborators.temp_dirs.allocate(TEMP_DIR_PREFIX)?;
    let build_options = BuildOptions {
        addon_dir: options.addon_dir.clone(),
        destination: temp_dir.path().to_path_buf(),
    };

    let xpi_path = collaborators
        .package_builder
        .build(&manifest, &build_options)
        .await?;

    println!(
        "{} {}",
        style("Created XPI for signing:").cyan().bold(),
        xpi_path.display()
    );

    Ok(XpiConfig {
        manifest,
        xpi_path,
        cleanup: Some(temp_dir),
    })
}

/// Sign an add-on
///
/// Returns the signing client's result unchanged. Errors from every step
/// are propagated as-is.
pub async fn sign(options: SignOptions, collaborators: &Collaborators) -> Result<SignResult> {
    let options = validate_options(options)?;

    let manifest = collaborators
        .manifest_reader
        .read(&options.addon_dir, options.xpi.as_deref())
        .await?;

    let xpi = acquire_package(manifest, &options, collaborators).await?;

    let client = collaborators.clients.create(options.client_config())?;
    let guid = derive_id(&xpi.manifest).ok_or(SignError::MissingId)?;

    let result = client
        .sign(&SignRequest {
            xpi_path: xpi.xpi_path.clone(),
            guid,
            version: xpi.manifest.version.clone(),
        })
        .await?;

    if let Some(cleanup) = xpi.cleanup {
        client.debug("cleaning up XPI temp directory");
        let path = cleanup.path().to_path_buf();
        if let Err(e) = cleanup.release() {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
    }

    Ok(result)
}

/// Check that the parsed arguments are usable before doing any work
pub fn validate_program(program: &SignArgs) -> Result<()> {
    if let Some(dir) = &program.addon_dir {
        if !dir.is_dir() {
            return Err(SignError::invalid_program(format!(
                "--addon-dir {} is not a directory",
                dir.display()
            )));
        }
    }

    if let Some(xpi) = &program.xpi {
        if !xpi.is_file() {
            return Err(SignError::invalid_program_with_help(
                format!("--xpi {} does not exist", xpi.display()),
                "Omit --xpi to package the add-on directory instead",
            ));
        }
    }

    Ok(())
}

/// Run the sign command and return the process exit code
///
/// Command-line options are laid over `options`.
pub async fn sign_cmd(program: &SignArgs, options: SignOptions, collaborators: &Collaborators) -> i32 {
    let outcome = match validate_program(program) {
        Ok(()) => sign(options.merge(program.to_options()), collaborators).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(result) if result.success => {
            println!("{}", style("SUCCESS").green().bold());
            exit_codes::SUCCESS
        }
        Ok(_) => {
            println!("{}", style("FAIL").red().bold());
            exit_codes::ERROR
        }
        Err(err) => {
            eprintln!("{}", style("FAIL").red().bold());
            if err.has_report() {
                eprintln!("{:?}", miette::Report::new(err));
            }
            exit_codes::ERROR
        }
    }
}
