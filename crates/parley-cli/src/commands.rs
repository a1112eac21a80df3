//! Command handlers for the Parley CLI
//!
//! Two layers: [`CommandDispatcher`] runs a parsed CLI subcommand, and [`ChatCommand`]
//! is one line typed into an interactive session.

use std::io::Write;
use std::str::FromStr;

use tracing::{info, warn};

use parley_core::{ChatSession, SortCriterion};

use crate::app::{self, ChatApp};
use crate::cli::Commands;
use crate::config::AppConfig;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Subcommand Dispatch
// ----------------------------------------------------------------------------

/// Command dispatcher for handling CLI subcommands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a CLI subcommand with the loaded configuration
    pub fn execute(command: Commands, config: AppConfig) -> Result<()> {
        match command {
            Commands::Chat { .. } => Self::handle_chat_command(config),
            Commands::Replay {
                file, sort, only, ..
            } => {
                let mut out = std::io::stdout();
                let report = app::replay(&config, &file, sort, &only, &mut out)?;
                info!(
                    messages = report.messages_received,
                    participants = report.new_participants,
                    "Replay finished"
                );
                Ok(())
            }
        }
    }

    fn handle_chat_command(config: AppConfig) -> Result<()> {
        info!(
            name = %config.session.local_name,
            host = %config.server.host,
            port = config.server.port,
            "Starting chat session"
        );
        let app = ChatApp::connect(&config)?;
        let report = app.run(std::io::stdin().lock(), &mut std::io::stdout())?;
        info!(
            messages = report.messages_received,
            reason = ?report.end_reason,
            "Chat session ended"
        );
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Interactive Commands
// ----------------------------------------------------------------------------

/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Empty the message log
    Clear,
    /// Set the selection filter, or toggle it when no argument is given
    Filter(Option<bool>),
    Sort(SortCriterion),
    /// Replace the selection with these registry ranks
    Select(Vec<usize>),
    /// Drop the selected participants' messages
    Remove,
    /// Ask the server to kick the selected participants
    Kick,
    /// List participants with their ranks
    Who,
    Quit,
    /// Plain chat text
    Say(String),
}

/// Whether the input loop should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

impl FromStr for ChatCommand {
    type Err = CliError;

    fn from_str(line: &str) -> Result<Self> {
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(ChatCommand::Say(line.to_string()));
        };

        let mut words = rest.split_whitespace();
        let command = match words.next().unwrap_or_default() {
            "clear" => ChatCommand::Clear,
            "filter" => match words.next() {
                None => ChatCommand::Filter(None),
                Some("on") => ChatCommand::Filter(Some(true)),
                Some("off") => ChatCommand::Filter(Some(false)),
                Some(other) => {
                    return Err(CliError::InvalidCommand(format!(
                        "/filter takes on or off, got {}",
                        other
                    )))
                }
            },
            "sort" => {
                let criterion = words.next().ok_or_else(|| {
                    CliError::InvalidCommand("/sort needs date, content or author".into())
                })?;
                ChatCommand::Sort(criterion.parse().map_err(CliError::InvalidCommand)?)
            }
            "select" => {
                let ranks = words
                    .by_ref()
                    .map(|word| {
                        word.parse::<usize>().map_err(|_| {
                            CliError::InvalidCommand(format!("not a participant rank: {}", word))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                ChatCommand::Select(ranks)
            }
            "remove" => ChatCommand::Remove,
            "kick" => ChatCommand::Kick,
            "who" => ChatCommand::Who,
            "quit" => ChatCommand::Quit,
            _ => return Ok(ChatCommand::Say(line.to_string())),
        };

        if let Some(extra) = words.next() {
            return Err(CliError::InvalidCommand(format!(
                "unexpected argument: {}",
                extra
            )));
        }
        Ok(command)
    }
}

impl ChatCommand {
    /// Apply the command to `session`; `out` receives listings such as `/who`
    ///
    /// Selection-based actions are refused while nothing is selected.
    pub fn apply<W: Write>(self, session: &ChatSession, out: &mut W) -> Result<Flow> {
        match self {
            ChatCommand::Clear => session.clear_messages(),
            ChatCommand::Filter(enabled) => {
                let enable = enabled.unwrap_or(!session.filter_enabled());
                if enable && !session.has_selection() {
                    warn!("Select participants before enabling the filter");
                } else {
                    session.set_filter(enable);
                }
            }
            ChatCommand::Sort(criterion) => session.sort_by(criterion),
            ChatCommand::Select(ranks) => session.set_selection(ranks.into_iter().collect()),
            ChatCommand::Remove => {
                if session.has_selection() {
                    session.remove_selected();
                } else {
                    warn!("Nothing selected to remove");
                }
            }
            ChatCommand::Kick => {
                if session.has_selection() {
                    session.kick_selected()?;
                } else {
                    warn!("Nothing selected to kick");
                }
            }
            ChatCommand::Who => {
                let selection = session.selection();
                for (rank, name) in session.registry().names().iter().enumerate() {
                    let marker = if selection.contains(rank) { "*" } else { " " };
                    writeln!(out, "{}{:>3}  {}", marker, rank, name)?;
                }
            }
            ChatCommand::Quit => return Ok(Flow::Quit),
            ChatCommand::Say(text) => {
                session.send_text(&text)?;
            }
        }
        Ok(Flow::Continue)
    }
}
