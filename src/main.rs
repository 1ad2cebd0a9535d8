//! ollama-pull - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures_util::StreamExt;
use std::io::Write;

use ollama_pull::cli::display::{show_error, show_model_info, show_models};
use ollama_pull::cli::{Args, Commands, Config, PullDisplay, Verbosity};
use ollama_pull::models::OllamaModelClient;
use ollama_pull::openai::{ChatCompletionRequest, ChatMessage, OpenAiClient};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbosity());

    let config = Config::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .with_overrides(args.host.clone(), args.port);
    config.validate()?;

    if !config.display.color_output {
        colored::control::set_override(false);
    }

    let outcome = match &args.command {
        Commands::List => list_models(&config).await,
        Commands::Show { name } => show_model(&config, name).await,
        Commands::Pull { name } => pull_model(&args, &config, name).await,
        Commands::Chat {
            prompt,
            model,
            stream,
        } => chat(&config, prompt, model.as_deref(), *stream).await,
        Commands::Config => show_config(&args, &config),
    };

    if let Err(e) = outcome {
        show_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}

/// Route library logs to stderr at the level chosen by -q/-v/-vv
fn init_logging(verbosity: Verbosity) {
    tracing_subscriber::fmt()
        .with_max_level(verbosity.log_level())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn list_models(config: &Config) -> Result<()> {
    let client = OllamaModelClient::new(config.client_options())?;
    let models = client.list_local_models().await.map_err(|e| {
        if e.is_transport() {
            eprintln!("\nIs the model server running at {}?", client.base_url());
        }
        e
    })?;

    show_models(&models);
    Ok(())
}

async fn show_model(config: &Config, name: &str) -> Result<()> {
    let client = OllamaModelClient::new(config.client_options())?;
    let info = client.model_info(name).await?;
    show_model_info(&info);
    Ok(())
}

async fn pull_model(args: &Args, config: &Config, name: &str) -> Result<()> {
    let client = OllamaModelClient::new(config.client_options())?;
    let show_progress = args.verbosity().show_progress() && config.display.show_progress_bars;

    let mut display = PullDisplay::new(name, show_progress);
    let mut progress = client.pull(name);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let cancelled = loop {
        tokio::select! {
            item = progress.next() => match item {
                Some(Ok(line)) => display.update(&line),
                Some(Err(e)) => {
                    display.finish_with_error(&format!("Pull of {} failed", name));
                    return Err(e.into());
                }
                None => break false,
            },
            _ = &mut ctrl_c => break true,
        }
    };

    if cancelled {
        // Dropping the stream closes the connection.
        tracing::info!("Pull of {} cancelled after {} lines", name, progress.received());
        drop(progress);
        display.finish_with_error("Pull cancelled");
        return Ok(());
    }

    display.finish_with_success(name);
    Ok(())
}

async fn chat(config: &Config, prompt: &str, model: Option<&str>, stream: bool) -> Result<()> {
    let client = OpenAiClient::new(&config.openai.base_url, config.openai.api_key.clone())?;
    let model = model.unwrap_or(config.openai.default_model.as_str());
    let request = ChatCompletionRequest::new(model, vec![ChatMessage::user(prompt)]);

    if !stream {
        let response = client.chat_completion(request).await?;
        println!("{}", response.content().unwrap_or_default());
        return Ok(());
    }

    let mut chunks = client.streaming_chat_completion(request).await?;
    let mut stdout = std::io::stdout();
    while let Some(chunk) = chunks.next().await {
        if let Some(text) = chunk?.content() {
            write!(stdout, "{}", text)?;
            stdout.flush()?;
        }
    }
    println!();
    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let source = match (&args.config, Config::default_path()) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(path)) if path.exists() => path.display().to_string(),
        _ => "built-in defaults".to_string(),
    };

    println!("{} {}", "Configuration:".bold(), source.dimmed());
    println!();

    let mut shown = config.clone();
    if shown.openai.api_key.is_some() {
        shown.openai.api_key = Some("<redacted>".to_string());
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    println!();
    println!("Verbosity: {}", args.verbosity().as_str());

    Ok(())
}
