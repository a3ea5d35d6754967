//! Xpi command - package an add-on without signing it

use clap::Args;
use console::style;
use std::path::{Path, PathBuf};
use xpisign_core::{BuildOptions, create_xpi, list_xpi, read_manifest};

use crate::error::Result;

/// Command-line arguments of `xpisign xpi`
#[derive(Args, Debug, Clone)]
pub struct XpiArgs {
    /// Add-on source directory
    #[arg(long, default_value = ".")]
    pub addon_dir: PathBuf,

    /// Directory the XPI is written to (defaults to the add-on directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn run(args: &XpiArgs) -> Result<PathBuf> {
    let manifest = read_manifest(&args.addon_dir, None)?;

    println!(
        "{} {} v{}",
        style("Packaging").cyan().bold(),
        manifest.display_name(),
        manifest.version
    );

    let destination = args.output.as_deref().unwrap_or(&args.addon_dir);
    let created = create_xpi(
        &manifest,
        &BuildOptions {
            addon_dir: args.addon_dir.clone(),
            destination: destination.to_path_buf(),
        },
    )?;

    let size = std::fs::metadata(&created)?.len();
    println!("  {} {}", style("Created").green().bold(), created.display());
    println!("  {} {}", style("Size").dim(), format_size(size));

    print_contents(&created)?;
    Ok(created)
}

fn print_contents(xpi: &Path) -> Result<()> {
    println!();
    println!("{}:", style("Contents").bold());
    for entry in list_xpi(xpi)?.iter().filter(|e| !e.is_dir) {
        println!("  {} {}", entry.path, style(format_size(entry.size)).dim());
    }
    Ok(())
}

/// Human-readable byte size
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
