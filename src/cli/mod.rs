use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

pub mod analyze;
pub mod ask;
pub mod chat;
pub mod render;

use crate::core::{AppConfig, init_logging};

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session (the default)
    Chat {},
    /// Ask a single question and print the reply
    Ask {
        #[arg(long)]
        question: String,
    },
    /// Send a single photo for analysis and print the advice
    Analyze {
        #[arg(long)]
        image: PathBuf,
    },
}

/// Settings shared by every command. Anything left unset falls back
/// to `AppConfig::default()`.
#[derive(Args, Debug, Default)]
struct Settings {
    /// Language the assistant should answer in
    #[arg(long, global = true)]
    language: Option<String>,

    /// Gemini model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Base URL of the Generative Language API
    #[arg(long, global = true)]
    api_host: Option<String>,

    /// JPEG quality for uploaded photos, greater than 0 and at most 1
    #[arg(long, global = true)]
    image_quality: Option<f32>,

    /// Photos are shrunk to fit within this many pixels
    #[arg(long, global = true)]
    image_max_dimension: Option<u32>,

    /// Directory photos are picked from in a chat session
    #[arg(long, global = true)]
    media_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true, action, default_value = "false")]
    verbose: bool,
}

impl Settings {
    fn apply(self, mut config: AppConfig) -> AppConfig {
        if let Some(language) = self.language {
            config.target_language = language;
        }
        if let Some(model) = self.model {
            config.gemini_model = model;
        }
        if let Some(host) = self.api_host {
            config.gemini_api_hostname = host;
        }
        if let Some(quality) = self.image_quality {
            config.image_quality = quality;
        }
        if let Some(max_dimension) = self.image_max_dimension {
            config.image_max_dimension = max_dimension;
        }
        if let Some(media_dir) = self.media_dir {
            config.media_dir = media_dir;
        }
        config
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    settings: Settings,
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    init_logging(args.settings.verbose)?;

    let config = args.settings.apply(AppConfig::default());
    config.validate()?;

    // Handle each sub command
    match args.command.unwrap_or(Command::Chat {}) {
        Command::Chat {} => {
            chat::run(&config).await?;
        }
        Command::Ask { question } => {
            ask::run(&config, &question).await?;
        }
        Command::Analyze { image } => {
            analyze::run(&config, &image).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_override_defaults() {
        let cli = Cli::parse_from([
            "sahayi",
            "ask",
            "--question",
            "When should I plant ginger?",
            "--language",
            "Hindi",
            "--image-quality",
            "0.5",
            "--media-dir",
            "/tmp/photos",
        ]);
        let config = cli.settings.apply(AppConfig::default());

        assert_eq!(config.target_language, "Hindi");
        assert_eq!(config.image_quality, 0.5);
        assert_eq!(config.media_dir, PathBuf::from("/tmp/photos"));
        assert_eq!(config.gemini_model, "gemini-1.5-flash-latest");
        assert!(matches!(cli.command, Some(Command::Ask { ref question }) if question == "When should I plant ginger?"));
    }

    #[test]
    fn test_no_subcommand_defaults_to_chat() {
        let cli = Cli::parse_from(["sahayi", "--verbose"]);
        assert!(cli.command.is_none());
        assert!(cli.settings.verbose);
    }
}
