//! Terminal rendering for the ollama-pull front end
//!
//! One progress bar per transferred digest plus a spinner for the current
//! phase of a pull.

use colored::*;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{ModelInfo, PullProgressLine};

/// Progress rendering for one pull
pub struct PullDisplay {
    multi_progress: MultiProgress,
    phase: ProgressBar,
    bars: HashMap<String, ProgressBar>,
}

impl PullDisplay {
    /// Create display; hidden when `enabled` is false
    pub fn new(model: &str, enabled: bool) -> Self {
        let multi_progress = if enabled {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let phase = multi_progress.add(ProgressBar::new_spinner());
        phase.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {prefix:.bold} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        phase.set_prefix(model.to_string());
        phase.enable_steady_tick(Duration::from_millis(100));

        Self {
            multi_progress,
            phase,
            bars: HashMap::new(),
        }
    }

    /// Render one progress line
    pub fn update(&mut self, line: &PullProgressLine) {
        self.phase.set_message(line.status.clone());

        let (Some(digest), Some(total)) = (&line.digest, line.total) else {
            return;
        };

        let multi_progress = &self.multi_progress;
        let bar = self.bars.entry(digest.clone()).or_insert_with(|| {
            let pb = multi_progress.add(ProgressBar::new(total));
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  {msg:20} [{bar:40.green/blue}] {bytes}/{total_bytes} {prefix}%")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
            );
            pb.set_message(short_digest(digest));
            pb
        });

        bar.set_length(total);
        if let Some(completed) = line.completed {
            bar.set_position(completed);
        }
        if let Some(pct) = line.percentage_label() {
            bar.set_prefix(pct);
        }
        if line.completed == Some(total) {
            bar.finish();
        }
    }

    /// Finish with success message
    pub fn finish_with_success(self, model: &str) {
        self.clear();
        println!("{} {}", "✓".green(), format!("Pulled {}", model).bold());
    }

    /// Finish with error message
    pub fn finish_with_error(self, message: &str) {
        self.clear();
        println!("{} {}", "✗".red(), message.red());
    }

    fn clear(&self) {
        for bar in self.bars.values() {
            bar.finish_and_clear();
        }
        self.phase.finish_and_clear();
    }
}

/// `sha256:d47ab88b61ba20ed...` -> `d47ab88b61ba`
fn short_digest(digest: &str) -> String {
    let hex = digest.split_once(':').map(|(_, h)| h).unwrap_or(digest);
    hex.chars().take(12).collect()
}

/// Print the model table
pub fn show_models(models: &[ModelInfo]) {
    if models.is_empty() {
        println!("No models installed.");
        println!("\nPull a model with:");
        println!("  ollama-pull pull llama3");
        return;
    }

    println!(
        "{:<32} {:>10}  {:<14} {}",
        "NAME".bold(),
        "SIZE".bold(),
        "DIGEST".bold(),
        "DETAILS".bold()
    );
    for model in models {
        let digest = model.digest.as_deref().map(short_digest).unwrap_or_default();
        println!(
            "{:<32} {:>10}  {:<14} {}",
            model.name,
            model.formatted_size(),
            digest.dimmed(),
            model.description()
        );
    }
}

/// Print details of one model
pub fn show_model_info(info: &ModelInfo) {
    println!("{}", info.name.bold().cyan());

    if let Some(details) = &info.details {
        println!("  {:<14} {}", "format", details.format);
        println!("  {:<14} {}", "family", details.family);
        if let Some(families) = &details.families {
            println!("  {:<14} {}", "families", families.join(", "));
        }
        if let Some(size) = &details.parameter_size {
            println!("  {:<14} {}", "parameters", size);
        }
        if let Some(quant) = &details.quantization_level {
            println!("  {:<14} {}", "quantization", quant);
        }
    }

    if let Some(parameters) = &info.parameters {
        println!("\n{}", "Parameters".bold());
        for line in parameters.lines() {
            println!("  {}", line);
        }
    }

    if let Some(template) = &info.template {
        println!("\n{}", "Template".bold());
        println!("{}", template.dimmed());
    }
}

/// Display error message
pub fn show_error(error: &str) {
    eprintln!("{} {}", "Error:".red().bold(), error.red());
}
