//! xpisign - sign Firefox extensions with addons.mozilla.org

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod collaborators;
mod commands;
mod error;
mod exit_codes;
mod options;

use collaborators::Collaborators;
use commands::sign::SignArgs;
use commands::xpi::XpiArgs;
use options::ConfigFile;

#[derive(Parser)]
#[command(name = "xpisign")]
#[command(version)]
#[command(about = "Sign Firefox extensions with the addons.mozilla.org signing API", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Package the add-on (unless --xpi is given) and sign it
    Sign(SignArgs),

    /// Package the add-on into an XPI without signing it
    Xpi(XpiArgs),
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .try_init();
}

fn fail(err: error::SignError) -> i32 {
    eprintln!("{}", style("FAIL").red().bold());
    eprintln!("{:?}", miette::Report::new(err));
    exit_codes::ERROR
}

fn run_sign(args: SignArgs, debug: bool) -> i32 {
    let configured = match ConfigFile::load(args.config.as_deref()) {
        Ok(configured) => configured,
        Err(err) => return fail(err),
    };
    init_logging(debug || args.verbose || configured.verbose == Some(true));

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => return fail(err.into()),
    };
    runtime.block_on(commands::sign::sign_cmd(
        &args,
        configured,
        &Collaborators::default(),
    ))
}

fn main() {
    miette::set_panic_hook();

    let cli = Cli::parse();

    if cli.debug {
        // SAFETY: we're the only thread at this point (start of main)
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }

    let code = match cli.command {
        Commands::Sign(args) => run_sign(args, cli.debug),
        Commands::Xpi(args) => {
            init_logging(cli.debug);
            match commands::xpi::run(&args) {
                Ok(_) => exit_codes::SUCCESS,
                Err(err) => fail(err),
            }
        }
    };

    std::process::exit(code);
}
