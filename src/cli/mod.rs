//! CLI module for Lectern.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lectern - study material to dialogues, audio, summaries and videos
///
/// Runs the HTTP API, or the dialogue and topic pipelines directly on a text file.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Turn a text file into a two-speaker dialogue
    Dialogue {
        /// Text file to convert
        input: String,

        /// Write the dialogue JSON here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },

    /// List the academic topics covered by a text file
    Topics {
        /// Text file to analyze
        input: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dialogue_command() {
        let cli = Cli::parse_from(["lectern", "-vv", "dialogue", "notes.txt", "-o", "out.json"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Dialogue { input, output } => {
                assert_eq!(input, "notes.txt");
                assert_eq!(output.as_deref(), Some("out.json"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_serve_overrides_are_optional() {
        let cli = Cli::parse_from(["lectern", "serve", "--port", "9000"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert!(host.is_none());
                assert_eq!(port, Some(9000));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
