//! Clap derive structures for the `chemviz` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use chemviz_core::{ListQuery, SortField};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// chemviz -- browse and manage chemical equipment datasets
#[derive(Debug, Parser)]
#[command(
    name = "chemviz",
    version,
    about = "Browse chemical equipment datasets from the command line",
    long_about = "Terminal front end for the chemical equipment dashboard API.\n\n\
        Lists, filters and sorts equipment records, uploads CSV datasets,\n\
        and downloads CSV exports and PDF dataset reports.",
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
    /// Server profile to use
    #[arg(long, short = 'p', env = "CHEMVIZ_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API server URL (overrides profile)
    #[arg(long, short = 's', env = "CHEMVIZ_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CHEMVIZ_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "CHEMVIZ_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (profile or 5s when unset)
    #[arg(long, env = "CHEMVIZ_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

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

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and persist the session token
    Login(LoginArgs),

    /// Drop the persisted session token
    Logout,

    /// Show server status and the current session
    Status,

    /// Browse equipment records
    #[command(alias = "eq", alias = "e")]
    Equipment(EquipmentArgs),

    /// Inspect uploaded datasets
    #[command(alias = "ds")]
    Datasets(DatasetsArgs),

    /// Upload a CSV file as a new dataset
    Upload(UploadArgs),

    /// Download the filtered equipment list as CSV
    Export(ExportArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Filter Arguments ──────────────────────────────────────────

/// Filter and sort arguments shared by listing and export commands.
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Free-text search across name, type and material
    #[arg(long)]
    pub search: Option<String>,

    /// Minimum pressure (inclusive)
    #[arg(long, allow_negative_numbers = true)]
    pub min_pressure: Option<f64>,

    /// Minimum temperature (inclusive)
    #[arg(long, allow_negative_numbers = true)]
    pub min_temperature: Option<f64>,

    /// Exact material
    #[arg(long)]
    pub material: Option<String>,

    /// Exact equipment type
    #[arg(long = "type", value_name = "TYPE")]
    pub equipment_type: Option<String>,

    /// Restrict to one dataset id
    #[arg(long)]
    pub dataset: Option<u64>,

    /// Sort column (name, type, material, pressure, temperature, flowrate)
    #[arg(long)]
    pub sort: Option<SortField>,

    /// Sort descending
    #[arg(long, requires = "sort")]
    pub desc: bool,
}

impl FilterArgs {
    /// Build a query the same way the dashboard's filter bar does:
    /// selecting a column sorts ascending, selecting it again flips it.
    pub fn to_query(&self) -> ListQuery {
        let mut query = ListQuery {
            search: self.search.clone().unwrap_or_default(),
            min_pressure: self.min_pressure,
            min_temperature: self.min_temperature,
            material: self.material.clone(),
            equipment_type: self.equipment_type.clone(),
            dataset: self.dataset,
            sort: None,
        };
        if let Some(field) = self.sort {
            query.toggle_sort(field);
            if self.desc {
                query.toggle_sort(field);
            }
        }
        query
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SESSION
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Username (defaults to the profile's, else prompts)
    #[arg(long, short = 'u')]
    pub username: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  EQUIPMENT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct EquipmentArgs {
    #[command(subcommand)]
    pub command: EquipmentCommand,
}

#[derive(Debug, Subcommand)]
pub enum EquipmentCommand {
    /// List one page of equipment
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Page to show, following next links from the first page
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
        page: u32,
    },

    /// Page through equipment interactively
    Browse {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Distinct materials on the first page
    Materials {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Pressure and temperature per record on the first page
    Chart {
        #[command(flatten)]
        filters: FilterArgs,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DATASETS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DatasetsArgs {
    #[command(subcommand)]
    pub command: DatasetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum DatasetsCommand {
    /// List the most recent uploads
    #[command(alias = "ls")]
    List,

    /// Show aggregates for one dataset
    Summary {
        /// Dataset id
        id: u64,
    },

    /// Download a dataset's PDF report
    Report {
        /// Dataset id
        id: u64,

        /// Destination file or directory
        #[arg(long = "out", short = 'O', default_value = ".")]
        dest: PathBuf,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  TRANSFER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UploadArgs {
    /// CSV file to upload
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Destination file or directory
    #[arg(long = "out", short = 'O', default_value = ".")]
    pub dest: PathBuf,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Set a configuration value
    Set {
        /// Config key (dot-separated path, e.g., "profiles.lab.server")
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
