//! Command line interface.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(name = "fitbit-sleep-bot", version, about = "Posts daily Fitbit sleep summaries to Slack")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authorize with Fitbit and save tokens
    Setup,
    /// Run the bot, polling immediately instead of waiting for the window
    Test,
    /// Announce a laptop lid event
    Lid {
        #[arg(value_enum)]
        event: LidEvent,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LidEvent {
    Sleep,
    Wake,
}

impl LidEvent {
    pub fn message(self) -> &'static str {
        match self {
            LidEvent::Sleep => "laptop's closed :(",
            LidEvent::Wake => "laptop's opened :D",
        }
    }
}
