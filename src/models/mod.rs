//! Model management module
//!
//! This module provides functionality for managing server-side models:
//! - Listing local models
//! - Viewing model information
//! - Pulling models with streamed progress
//! - Classifying upstream error bodies

pub mod classify;
pub mod client;
pub mod pull;
pub mod types;

// Re-export key types for convenience
pub use classify::classify_failure;
pub use client::{ClientOptions, ModelApi, OllamaModelClient, DEFAULT_HOST, DEFAULT_PORT};
pub use pull::PullStream;
pub use types::{format_size, ModelDetails, ModelInfo, PullProgressLine, PULL_SUCCESS_STATUS};
