pub mod cli;
pub mod common;
pub mod config;
pub mod manifest;

pub use cli::{
    build_cli_command, ApplyArgs, BackendArg, Cli, Commands, InputArgs, PlantsCommands,
    ScenariosCommands, ValidateArgs,
};
