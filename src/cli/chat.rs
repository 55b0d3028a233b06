use std::io;

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use super::render::Renderer;
use crate::ai::chat::SessionBuilder;
use crate::core::AppConfig;
use crate::gemini::GeminiClient;
use crate::media::TerminalPicker;

const BANNER: &str = r"
🌾 കൃഷി സഹായി (Krishi Sahayi)
Ask a farming question, type /image to send a photo for analysis or /quit to leave.
";

#[derive(Debug, PartialEq)]
enum Intent<'a> {
    Text(&'a str),
    PickImage,
    Quit,
}

impl<'a> Intent<'a> {
    fn parse(line: &'a str) -> Self {
        match line.trim() {
            "/image" | "/photo" => Intent::PickImage,
            "/quit" | "/exit" => Intent::Quit,
            _ => Intent::Text(line),
        }
    }
}

pub async fn run(config: &AppConfig) -> Result<()> {
    let mut rl = DefaultEditor::new().context("Failed to start line editor")?;

    let gateway = GeminiClient::from_config(config);
    let media = TerminalPicker::new(&config.media_dir);
    let mut session = SessionBuilder::from_config(config, gateway, media).build();
    tracing::info!(session = %session.session_id(), "Chat session started");

    println!("{}", BANNER);
    let mut renderer = Renderer::new(io::stdout());
    renderer.render(&session.snapshot())?;

    loop {
        let readline = rl.readline(">>> ");
        match readline {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());

                let turn = match Intent::parse(&line) {
                    Intent::Quit => break,
                    Intent::PickImage => session.pick_image().await,
                    Intent::Text(text) => {
                        session.update_draft(text);
                        session.submit_draft()
                    }
                };

                // Draw the busy state before waiting on the network
                if let Some(turn) = turn {
                    renderer.render(&session.snapshot())?;
                    session.run_turn(turn).await;
                }

                renderer.render(&session.snapshot())?;
                // Notices are one shot, drop it once it has been shown
                session.take_notice();
            }
            Err(ReadlineError::Interrupted) => break,
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }

    tracing::info!(
        session = %session.session_id(),
        messages = session.transcript().len(),
        "Chat session ended"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_intents() {
        assert_eq!(Intent::parse("/image"), Intent::PickImage);
        assert_eq!(Intent::parse("  /photo "), Intent::PickImage);
        assert_eq!(Intent::parse("/quit"), Intent::Quit);
        assert_eq!(Intent::parse("/exit"), Intent::Quit);
        assert_eq!(
            Intent::parse("Why are my coconut leaves yellow?"),
            Intent::Text("Why are my coconut leaves yellow?")
        );
        assert_eq!(Intent::parse(""), Intent::Text(""));
    }
}
