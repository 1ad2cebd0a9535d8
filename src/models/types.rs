//! Type definitions for the model-management API
//!
//! Wire names are snake_case and `None` fields are omitted when serialized.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported by the final line of a successful pull
pub const PULL_SUCCESS_STATUS: &str = "success";

/// Information about a locally available model
///
/// The list endpoint fills the base fields; the show endpoint fills
/// `details` plus the `modelfile`, `parameters` and `template` text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model name (e.g., "llama3:latest"), the lookup key for detail queries
    pub name: String,

    /// Last modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,

    /// Model size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Model digest/hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ModelDetails>,

    /// Full modelfile text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modelfile: Option<String>,

    /// Runtime parameters, one per line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<String>,

    /// Prompt template
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

/// Detailed model information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDetails {
    /// Model format (e.g., "gguf")
    pub format: String,

    /// Model family (e.g., "llama")
    pub family: String,

    /// Related families, when the model combines several (e.g., ["llama", "clip"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub families: Option<Vec<String>>,

    /// Parameter size (e.g., "7B", "13B")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_size: Option<String>,

    /// Quantization level (e.g., "Q4_0", "Q4_K_M")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization_level: Option<String>,
}

/// Response from the list-models endpoint
#[derive(Debug, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

/// Response from the show endpoint, which does not echo the model name
#[derive(Debug, Deserialize)]
pub struct ShowResponse {
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub details: Option<ModelDetails>,

    #[serde(default)]
    pub modelfile: Option<String>,

    #[serde(default)]
    pub parameters: Option<String>,

    #[serde(default)]
    pub template: Option<String>,
}

impl ShowResponse {
    /// Attach the requested name
    pub fn into_model_info(self, name: &str) -> ModelInfo {
        ModelInfo {
            name: name.to_string(),
            modified_at: self.modified_at,
            size: None,
            digest: None,
            details: self.details,
            modelfile: self.modelfile,
            parameters: self.parameters,
            template: self.template,
        }
    }
}

/// Body of the show and pull requests
#[derive(Debug, Clone, Serialize)]
pub struct ModelRequest<'a> {
    pub name: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

/// One progress record from a pull stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullProgressLine {
    /// Phase description
    pub status: String,

    /// Digest of the blob being transferred
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Total bytes to download
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    /// Bytes completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<u64>,
}

/// A decoded pull line: either progress or an error reported mid-stream
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PullStreamLine {
    Failure { error: String },
    Progress(PullProgressLine),
}

impl ModelInfo {
    /// Format the model size in human-readable format
    pub fn formatted_size(&self) -> String {
        self.size.map(format_size).unwrap_or_else(|| "-".to_string())
    }

    /// Get a short description of the model
    pub fn description(&self) -> String {
        if let Some(ref details) = self.details {
            let mut parts = vec![details.family.clone()];

            if let Some(ref param) = details.parameter_size {
                parts.push(param.clone());
            }

            if let Some(ref quant) = details.quantization_level {
                parts.push(quant.clone());
            }

            return parts.join(" ");
        }

        self.formatted_size()
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.formatted_size())
    }
}

impl PullProgressLine {
    /// True for the final line of a successful pull
    pub fn is_terminal(&self) -> bool {
        self.status == PULL_SUCCESS_STATUS
    }

    /// Transfer progress in percent, when both byte counts are known
    ///
    /// The ratio is rounded half-down to 4 decimal places, so the percentage
    /// carries exactly 2.
    pub fn percentage(&self) -> Option<f64> {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                Some(ratio_basis_points(completed, total) as f64 / 100.0)
            }
            _ => None,
        }
    }

    /// Percentage rendered with two decimal places (e.g. "11.29")
    pub fn percentage_label(&self) -> Option<String> {
        match (self.completed, self.total) {
            (Some(completed), Some(total)) if total > 0 => {
                let bp = ratio_basis_points(completed, total);
                Some(format!("{}.{:02}", bp / 100, bp % 100))
            }
            _ => None,
        }
    }
}

impl fmt::Display for PullProgressLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentage_label() {
            Some(pct) => write!(f, "{} ({}%)", self.status, pct),
            None => write!(f, "{}", self.status),
        }
    }
}

/// `completed / total` in units of 1/10000, rounded half-down
fn ratio_basis_points(completed: u64, total: u64) -> u128 {
    let scaled = completed as u128 * 10_000;
    let total = total as u128;
    let quotient = scaled / total;
    let remainder = scaled % total;
    if remainder * 2 > total {
        quotient + 1
    } else {
        quotient
    }
}

/// Format bytes into human-readable size
pub fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let base: f64 = 1024.0;
    let exponent = (bytes as f64).log(base).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);

    let size = bytes as f64 / base.powi(exponent as i32);

    format!("{:.2} {}", size, UNITS[exponent])
}
