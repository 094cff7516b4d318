mod commands;

use clap::{Parser, Subcommand};
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use modfile_schema::{ParseMode, MODULE_FILE};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "modfile",
    version,
    about = "Check and format versioned module files"
)]
struct Cli {
    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse and validate a module file and summarize its dependencies.
    Check {
        /// Path to the module file.
        #[arg(default_value = MODULE_FILE)]
        manifest: PathBuf,
        /// Fill in missing major versions instead of rejecting them.
        #[arg(long, default_value_t = false, conflicts_with = "legacy")]
        lax: bool,
        /// Read only the module path, ignoring every other field.
        #[arg(long, default_value_t = false)]
        legacy: bool,
    },
    /// Rewrite a module file in canonical form.
    Fmt {
        /// Path to the module file.
        #[arg(default_value = MODULE_FILE)]
        manifest: PathBuf,
        /// Fill in missing major versions instead of rejecting them.
        #[arg(long, default_value_t = false)]
        lax: bool,
        /// Exit non-zero if the file is not already in canonical form.
        #[arg(long, default_value_t = false)]
        check: bool,
    },
    /// Show the supported language version and the known schema versions.
    Schema,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("MODFILE_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = match cli.command {
        Commands::Check {
            manifest,
            lax,
            legacy,
        } => {
            let mode = if legacy {
                ParseMode::Legacy
            } else if lax {
                ParseMode::NonStrict
            } else {
                ParseMode::Strict
            };
            commands::check::run(&manifest, mode, json_output)
        }
        Commands::Fmt {
            manifest,
            lax,
            check,
        } => commands::fmt::run(&manifest, lax, check, json_output),
        Commands::Schema => commands::schema::run(json_output),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:")
                || msg.starts_with("failed to read manifest")
            {
                EXIT_MANIFEST_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}
