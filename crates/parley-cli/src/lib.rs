//! Parley CLI library
//!
//! Terminal glue around `parley-core`: argument parsing, layered configuration, the TCP
//! chat client, the slash-command surface and a crossterm render sink.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod terminal;

pub use app::ChatApp;
pub use cli::{Cli, Commands};
pub use commands::{ChatCommand, CommandDispatcher, Flow};
pub use config::{AppConfig, ConfigOverrides};
pub use error::{CliError, Result};
pub use terminal::TerminalRenderSink;
