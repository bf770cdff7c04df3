//! Clap derive structures for the `sliceflow` CLI.
//!
//! Only clap types live here: `build.rs` compiles this file on its own
//! to render man pages.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// sliceflow -- slice-aware flow decisions for SDN controllers
#[derive(Debug, Parser)]
#[command(
    name = "sliceflow",
    version,
    about = "Slice-aware SDN flow controller",
    long_about = "Decides where packets go based on operator-defined network slices.\n\n\
        Slices map (element, source, destination) to egress ports; toggling a\n\
        slice resynchronizes every connected element's flow table.",
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
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "SLICEFLOW_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Scenario file (overrides profile)
    #[arg(long, env = "SLICEFLOW_SCENARIO", global = true)]
    pub scenario: Option<PathBuf>,

    /// Address layer slices are matched on (overrides profile)
    #[arg(long, env = "SLICEFLOW_ADDRESS_MODE", global = true)]
    pub address_mode: Option<AddressModeArg>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SLICEFLOW_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Value Enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AddressModeArg {
    /// Ethernet (MAC) addresses
    Link,
    /// IPv4 addresses
    Network,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load and validate a scenario file
    Check(CheckArgs),

    /// List the slices a scenario defines
    #[command(alias = "ls")]
    Slices,

    /// Resolve the egress ports for one flow
    Resolve(ResolveArgs),

    /// Run the controller, bridging events over stdin/stdout as JSON lines
    Run(RunArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Command Arguments ────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Scenario to validate (defaults to --scenario or the profile's)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Element id (decimal or 0x-hex) or topology name
    #[arg(long, short = 'e')]
    pub element: String,

    /// Source host name or address
    #[arg(long, short = 's')]
    pub source: String,

    /// Destination host name or address
    #[arg(long, short = 'd')]
    pub destination: String,

    /// Active slices in activation order (defaults to the profile's)
    #[arg(long, short = 'a', value_delimiter = ',')]
    pub active: Option<Vec<String>>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Slices active at startup (defaults to the profile's)
    #[arg(long, short = 'a', value_delimiter = ',')]
    pub active: Option<Vec<String>>,

    /// Ignore the profile's queue provisioner
    #[arg(long)]
    pub no_provisioner: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show,

    /// Print the configuration file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
