// lepasserelle - Command-Line Bridge
//
// *La Passerelle* (The Bridge) - CLI front end over the leplan trip planning engine

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

//! Command-line front end for the `leplan` sequential trip planner.

/// Command-line parsing and command implementations
pub mod cli;
/// TOML configuration
pub mod config;
/// Console progress sink
pub mod console;
/// CLI errors and user-facing formatting
pub mod errors;

pub use cli::{Cli, Commands, ConfigAction, PlanArgs};
pub use config::PlannerConfig;
pub use console::ConsoleSink;
pub use errors::{format_anyhow, format_error, CliError};
