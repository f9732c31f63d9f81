//! `addrsync` command line tool.
//!
//! Reads addresses from a file or stdin, then replaces the configured
//! RouterOS address list with them.
//!
//! ```bash
//! addrsync blocklist.txt -c router.toml
//! curl -s https://example.net/drop.txt | addrsync
//! ```

use std::fs::File;
use std::io::{self, BufReader, IsTerminal};
use std::path::PathBuf;
use std::process::ExitCode;

use addrsync::address::{FilterReport, read_addresses};
use addrsync::config::{Config, DEFAULT_CONFIG_PATH};
use addrsync::error::InputError;
use addrsync::sync::{self, AddressListUpdate, SyncOutcome};
use addrsync::transport::SshConnector;
use clap::Parser;
use log::debug;

/// Exit status when the router rejected one or more add commands.
const EXIT_PARTIAL: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "addrsync",
    version,
    about = "Update a MikroTik address list from a file or stdin"
)]
struct Cli {
    /// File with IP addresses/networks, one per line (`#` starts a comment).
    /// Reads stdin when omitted.
    file: Option<PathBuf>,

    /// Config file with router connection info
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Print the router commands instead of connecting
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, addrsync::Error> {
    let config = Config::load(&cli.config)?;
    let router = &config.router;
    debug!("loaded {}", cli.config.display());

    let report = read_input(cli.file.as_ref())?;
    for rejected in &report.rejected {
        eprintln!("Skipping invalid line: {}", rejected.line);
    }

    if report.is_empty() {
        eprintln!("No valid addresses found. Exiting.");
        return Ok(ExitCode::SUCCESS);
    }

    let update = AddressListUpdate::new(&router.address_list, report.entries);

    if cli.dry_run {
        for command in update.commands() {
            println!("{}", command);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let mut connector = SshConnector::new(router.ssh_config());
    match sync::push(&mut connector, &update, router.session_config()).await? {
        SyncOutcome::Skipped => Ok(ExitCode::SUCCESS),
        SyncOutcome::Applied(summary) => {
            eprintln!(
                "Address list '{}': {} added, {} rejected by router.",
                update.list(),
                summary.added,
                summary.failures.len()
            );
            if summary.is_success() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_PARTIAL))
            }
        }
    }
}

fn read_input(file: Option<&PathBuf>) -> Result<FilterReport, InputError> {
    match file {
        Some(path) => {
            let file = File::open(path).map_err(|source| InputError::Open {
                path: path.clone(),
                source,
            })?;
            read_addresses(BufReader::new(file))
        }
        None => {
            let stdin = io::stdin();
            if stdin.is_terminal() {
                eprintln!(
                    "Reading addresses from stdin... (Ctrl-D to end on Linux/macOS, Ctrl-Z on Windows)"
                );
            }
            read_addresses(stdin.lock())
        }
    }
}
