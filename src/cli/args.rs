//! Command-line argument parsing for ollama-pull
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;

/// ollama-pull - inspect and pull models on a local model server
#[derive(Parser, Debug)]
#[command(name = "ollama-pull")]
#[command(version)]
#[command(about = "List, inspect and pull models on a local model server", long_about = None)]
pub struct Args {
    /// Model server host (overrides the config file)
    #[arg(long)]
    pub host: Option<String>,

    /// Model server port (overrides the config file)
    #[arg(long)]
    pub port: Option<u16>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List local models
    List,

    /// Show details of one model
    Show {
        /// Model name (e.g. llama3:latest)
        name: String,
    },

    /// Pull a model, reporting progress
    Pull {
        /// Model name (e.g. llama3:latest)
        name: String,
    },

    /// One-shot chat completion against the OpenAI-compatible endpoint
    Chat {
        /// Prompt text
        prompt: String,

        /// Model to use (defaults to openai.default_model)
        #[arg(short, long)]
        model: Option<String>,

        /// Print tokens as they arrive
        #[arg(long)]
        stream: bool,
    },

    /// Display current configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }

    /// Most detailed log level emitted to stderr
    pub fn log_level(&self) -> Level {
        match self {
            Verbosity::Quiet => Level::ERROR,
            Verbosity::Normal => Level::WARN,
            Verbosity::Verbose => Level::DEBUG,
            Verbosity::VeryVerbose => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["ollama-pull", "-q", "list"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["ollama-pull", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["ollama-pull", "-v", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(
            parse(&["ollama-pull", "-vv", "list"]).verbosity(),
            Verbosity::VeryVerbose
        );
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(Verbosity::Quiet.log_level(), Level::ERROR);
        assert_eq!(Verbosity::Verbose.log_level(), Level::DEBUG);
        assert!(!Verbosity::Quiet.show_progress());
        assert_eq!(Verbosity::VeryVerbose.as_str(), "very_verbose");
    }

    #[test]
    fn test_pull_command() {
        let args = parse(&["ollama-pull", "--host", "gpu-box", "--port", "8080", "pull", "llama3"]);
        assert_eq!(args.host.as_deref(), Some("gpu-box"));
        assert_eq!(args.port, Some(8080));
        assert_eq!(
            args.command,
            Commands::Pull {
                name: "llama3".to_string()
            }
        );
    }

    #[test]
    fn test_chat_command() {
        let args = parse(&["ollama-pull", "chat", "hello", "--stream", "-m", "gpt-4o"]);
        match args.command {
            Commands::Chat {
                prompt,
                model,
                stream,
            } => {
                assert_eq!(prompt, "hello");
                assert_eq!(model.as_deref(), Some("gpt-4o"));
                assert!(stream);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["ollama-pull"]).is_err());
    }
}
