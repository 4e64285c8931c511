//! vpmdex CLI - VPM package listings from GitHub releases

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod error;
mod exit_codes;
mod logging;
mod util;

use error::{CliError, Result};

#[derive(Parser)]
#[command(name = "vpmdex")]
#[command(version)]
#[command(about = "Generate VPM package listings from GitHub releases", long_about = None)]
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
    /// Merge a repository's releases into its index files
    Generate(commands::generate::GenerateArgs),

    /// Show the packages and versions of an index file
    List {
        /// Index file
        index: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() {
                exit_codes::USAGE_ERROR
            } else {
                exit_codes::SUCCESS
            };
            // Help and version go to stdout
            let _ = err.print();
            std::process::exit(code);
        }
    };

    logging::init(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Generate(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|e| CliError::internal(format!("Failed to start runtime: {}", e)))?;
            runtime.block_on(commands::generate::run(&args))
        }

        Commands::List { index, json } => commands::list::run(&index, json),
    }
}
