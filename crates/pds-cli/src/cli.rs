use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use pds_ts::BackendKind;
use std::path::PathBuf;

use crate::common::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "pds", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides `[logging] level` in the config)
    #[arg(long, global = true)]
    pub log_level: Option<tracing::Level>,

    /// Configuration file (defaults to ./pds.toml when present)
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write scenario setpoints into the target model
    Apply(ApplyArgs),
    /// Inspect the plant-to-unit map
    Plants {
        #[command(subcommand)]
        command: PlantsCommands,
    },
    /// Inspect the scenario table
    Scenarios {
        #[command(subcommand)]
        command: ScenariosCommands,
    },
    /// Check the input tables (and optionally the series) without writing
    Validate(ValidateArgs),
}

/// Paths shared by every command; each falls back to `[inputs]` in the config.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Plant map CSV (system, category, plant_name, weight, target_unit_name)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub plant_map: Option<PathBuf>,

    /// Scenario CSV (stage, run, interval, label)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub scenarios: Option<PathBuf>,

    /// Text encoding of input tables and series (utf-8 or latin1)
    #[arg(long)]
    pub encoding: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Target units CSV (name, class)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub units: Option<PathBuf>,

    /// Directory holding the result series (duraci.csv, gerhid.csv, ...)
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub case_path: Option<PathBuf>,

    /// How series files are read
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Where saved scenarios, the dispatch report and the run manifest go
    #[arg(long, short = 'o', value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,

    /// Only process these stages (repeatable)
    #[arg(long = "stage", value_name = "N")]
    pub stages: Vec<u32>,

    /// Record a failing scenario and continue with the next one
    #[arg(long)]
    pub continue_on_error: bool,

    /// Compute and print setpoints without saving any scenario
    #[arg(long)]
    pub dry_run: bool,

    /// Output format for the summary
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    /// Target units CSV; enables unit coverage checks
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub units: Option<PathBuf>,

    /// Series directory; enables series and duration checks
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub case_path: Option<PathBuf>,

    /// Output format for the issue list
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum PlantsCommands {
    /// List normalized plant-to-unit bindings
    List {
        #[command(flatten)]
        inputs: InputArgs,
        /// Show weights as written instead of normalized
        #[arg(long)]
        raw: bool,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum ScenariosCommands {
    /// List scenarios in processing order
    List {
        #[command(flatten)]
        inputs: InputArgs,
        /// Only list these stages (repeatable)
        #[arg(long = "stage", value_name = "N")]
        stages: Vec<u32>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendArg {
    /// Load each series into memory once
    Frame,
    /// Scan series files on demand
    Stream,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Frame => BackendKind::Frame,
            BackendArg::Stream => BackendKind::Stream,
        }
    }
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
