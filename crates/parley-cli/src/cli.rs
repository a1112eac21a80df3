//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use parley_core::SortCriterion;

use crate::config::ConfigOverrides;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to a chat server and start an interactive session
    Chat {
        /// Your display name
        #[arg(short, long)]
        name: Option<String>,
        /// Server host
        #[arg(long)]
        host: Option<String>,
        /// Server port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ingest a JSON-lines transcript and print the resulting view
    Replay {
        /// Transcript file, one JSON message per line
        file: PathBuf,
        /// Local participant name
        #[arg(short, long)]
        name: Option<String>,
        /// Sort criterion (date, content or author)
        #[arg(short, long)]
        sort: Option<SortCriterion>,
        /// Only show messages from these participants
        #[arg(short, long = "only")]
        only: Vec<String>,
    },
}

impl Cli {
    /// Configuration values given as flags, highest priority layer
    pub fn overrides(&self) -> ConfigOverrides {
        match &self.command {
            Commands::Chat { name, host, port } => ConfigOverrides {
                name: name.clone(),
                host: host.clone(),
                port: *port,
            },
            Commands::Replay { name, .. } => ConfigOverrides {
                name: name.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}
