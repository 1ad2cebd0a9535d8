//! CLI module for ollama-pull
//!
//! Handles command-line argument parsing, configuration and terminal output.

pub mod args;
pub mod config;
pub mod display;

pub use args::{Args, Commands, Verbosity};
pub use config::Config;
pub use display::PullDisplay;
