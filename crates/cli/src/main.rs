//! idlookup command-line batch lookup tool.
//!
//! Reads organizational identifiers from a file, looks each one up in the
//! directory, and writes `names.tmp` ("Lastname Firstname-id" lines) and
//! `emails.tmp` (matching email addresses) in the current directory.

mod prompt;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use idlookup_core::config::{Backend, LookupConfig};
use idlookup_core::directory::{CommandDirectory, DirectoryClient, LdapDirectory};
use idlookup_core::runner::{BatchRunner, BatchSummary};

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Look up identifiers in the directory and write name/email reports.
#[derive(Parser, Debug)]
#[command(name = "idlookup", version, about = "Batch directory lookup of organizational identifiers")]
struct Cli {
    /// File with one identifier per line.
    #[arg(required_unless_present = "print_config")]
    input: Option<PathBuf>,

    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lookup backend, overriding the configuration.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Bind identity; skips the `bind name` prompt.
    #[arg(long)]
    bind_name: Option<String>,

    /// Names report path (default `names.tmp`).
    #[arg(long)]
    names_out: Option<PathBuf>,

    /// Emails report path (default `emails.tmp`).
    #[arg(long)]
    emails_out: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    print_config: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Ldap,
    Command,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Ldap => Backend::Ldap,
            BackendArg::Command => Backend::Command,
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", style::fatal(&e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr; stdout carries prompts, progress and diagnostics.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if cli.print_config {
        let text = toml::to_string_pretty(&config).context("failed to serialize configuration")?;
        print!("{text}");
        return Ok(());
    }

    let input = cli
        .input
        .as_deref()
        .context("missing input file argument")?;

    let credentials = prompt::read_credentials(
        cli.bind_name.clone(),
        config.directory.resolve_password_env(),
    )?;

    let summary = match config.directory.backend {
        Backend::Ldap => {
            let client = LdapDirectory::new(&config.directory, &config.attributes, credentials);
            run_batch(client, &config, input).await?
        }
        Backend::Command => {
            let client = CommandDirectory::new(&config.command, &config.directory, credentials);
            run_batch(client, &config, input).await?
        }
    };

    print_summary(&summary, &config);
    Ok(())
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("idlookup").join("config.toml"))
}

fn load_config(cli: &Cli) -> Result<LookupConfig> {
    let mut config = match (&cli.config, default_config_path()) {
        (Some(path), _) => {
            LookupConfig::load_from_file(path).context("failed to load configuration file")?
        }
        (None, Some(path)) => {
            LookupConfig::load_or_default(&path).context("failed to load configuration file")?
        }
        (None, None) => {
            debug!("no config directory on this platform, using defaults");
            LookupConfig::default()
        }
    };

    if let Some(backend) = cli.backend {
        config.directory.backend = backend.into();
    }
    if let Some(path) = &cli.names_out {
        config.output.names_file = path.clone();
    }
    if let Some(path) = &cli.emails_out {
        config.output.emails_file = path.clone();
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

async fn run_batch<D: DirectoryClient>(
    client: D,
    config: &LookupConfig,
    input: &Path,
) -> Result<BatchSummary> {
    info!(backend = ?config.directory.backend, input = %input.display(), "starting batch");
    let mut runner = BatchRunner::new(client, config.attributes.clone());
    let mut stdout = std::io::stdout();
    let summary = runner
        .run_file(input, &config.output, &mut stdout)
        .await
        .context("batch lookup aborted")?;
    Ok(summary)
}

fn print_summary(summary: &BatchSummary, config: &LookupConfig) {
    println!(
        "{}",
        style::summary(summary, &config.output.names_file, &config.output.emails_file)
    );
}
