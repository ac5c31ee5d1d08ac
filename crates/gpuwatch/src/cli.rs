//! Clap derive structures for the `gpuwatch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// gpuwatch -- keep a telemetry watch alive and print the latest samples
#[derive(Debug, Parser)]
#[command(
    name = "gpuwatch",
    version,
    about = "Watch GPU telemetry fields and print the latest samples",
    long_about = "Connects to a GPU telemetry service (or starts one in-process),\n\
        keeps a named device group and field group reconciled, watches them,\n\
        and prints the latest value of every field on every device each tick.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, short = 'c', global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Watch fields and print samples until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List the fields this build knows by name
    Fields,

    /// Inspect the effective configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (file + env + defaults) as TOML
    Show,
    /// Print the config file path
    Path,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Start an in-process telemetry engine instead of connecting.
    ///
    /// The engine has no hardware backend, so this only checks that the
    /// groups and watch come up; no samples are printed.
    #[arg(long, conflicts_with = "address")]
    pub embedded: bool,

    /// Telemetry service address (host:port)
    #[arg(long, short = 'a', value_name = "HOST:PORT")]
    pub address: Option<String>,

    /// Connect without TLS, ignoring configured credentials
    #[arg(long)]
    pub unauth: bool,

    /// CA certificate the service certificate must chain to
    #[arg(long, value_name = "PEM")]
    pub root_ca: Option<PathBuf>,

    /// Client certificate presented to the service
    #[arg(long, value_name = "PEM")]
    pub client_cert: Option<PathBuf>,

    /// Private key for the client certificate
    #[arg(long, value_name = "PEM")]
    pub client_key: Option<PathBuf>,

    /// Field names to watch, e.g. RDC_FI_GPU_TEMP (overrides --fields-file)
    #[arg(long, short = 'f', value_delimiter = ',', num_args = 1..)]
    pub fields: Option<Vec<String>>,

    /// File listing one field name per line
    #[arg(long, value_name = "PATH")]
    pub fields_file: Option<PathBuf>,

    /// Device indices to watch (default: every device)
    #[arg(long, short = 'd', value_delimiter = ',', num_args = 1..)]
    pub devices: Option<Vec<u32>>,

    /// Service sampling interval in seconds
    #[arg(long, value_name = "SECS")]
    pub update_interval: Option<u64>,

    /// How long the service keeps samples, in seconds
    #[arg(long, value_name = "SECS")]
    pub max_keep_age: Option<u64>,

    /// How many samples the service keeps per field
    #[arg(long, value_name = "N")]
    pub max_keep_samples: Option<u32>,

    /// Print values in service units without conversion
    #[arg(long)]
    pub raw: bool,

    /// Seconds between sampling passes
    #[arg(long, default_value = "1", value_name = "SECS")]
    pub tick: u64,

    /// Stop after this many passes
    #[arg(long, value_name = "N")]
    pub count: Option<u64>,
}
