//! fmctl command line.
//!
//! ```bash
//! fmctl list
//! fmctl --json status 3
//! fmctl --address 10.0.0.5:6666 activate 3
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::warn;

use fmctl::commands::{self, CommandError, OutputFormat, PartitionCommand};
use fmctl::config::Config;
use fmctl::output::{self, ConnectionInfo};
use fmctl::utils::bootstrap::init_tracing;
use fmctl::Capability;

/// Control NVIDIA Fabric Manager partitions.
#[derive(Parser, Debug)]
#[command(name = "fmctl", version)]
#[command(about = "Manage NVIDIA Fabric Manager fabric partitions")]
struct Cli {
    /// FM daemon address or socket path.
    #[arg(long, global = true)]
    address: Option<String>,

    /// Connection timeout in milliseconds.
    #[arg(long, global = true)]
    timeout: Option<u32>,

    /// Output in JSON format.
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to libnvfm.
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all fabric partitions.
    List,
    /// Show status of a specific partition.
    Status { partition_id: u32 },
    /// Activate a fabric partition.
    Activate { partition_id: u32 },
    /// Deactivate a fabric partition.
    Deactivate { partition_id: u32 },
    /// Show FM connection information.
    Info,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(out) => {
            print!("{}", out);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, CommandError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(address) = cli.address {
        config.connection.address = address;
        config.connection.unix_socket = None;
    }
    if let Some(timeout) = cli.timeout {
        config.connection.timeout_ms = timeout;
    }
    if let Some(library) = cli.library {
        config.library.path = Some(library);
    }

    let format = OutputFormat::from_json_flag(cli.json);
    let command = match cli.command {
        Command::Info => return info(&config, format),
        Command::List => PartitionCommand::List,
        Command::Status { partition_id } => PartitionCommand::Status(partition_id),
        Command::Activate { partition_id } => PartitionCommand::Activate(partition_id),
        Command::Deactivate { partition_id } => PartitionCommand::Deactivate(partition_id),
    };

    let manager = Capability::probe(config.library.path.as_deref()).into_manager()?;
    let connection = manager.connect(&config.connect_params())?;
    let out = commands::execute(&connection, command, format)?;

    if let Err(e) = connection.disconnect() {
        warn!(error = %e, "Disconnect failed");
    }
    if let Err(e) = manager.shutdown() {
        warn!(error = %e, "Library shutdown failed");
    }
    Ok(out)
}

fn info(config: &Config, format: OutputFormat) -> Result<String, CommandError> {
    let params = config.connect_params();
    let library = Capability::probe(config.library.path.as_deref())
        .label()
        .to_string();
    let info = ConnectionInfo::new(
        params.address,
        params.timeout_ms,
        params.address_is_unix_socket,
        library,
    );

    match format {
        OutputFormat::Text => Ok(info.render()),
        OutputFormat::Json => Ok(output::to_json(&info)?),
    }
}
